//! Keyword-driven feedback classification.
//!
//! Two matching modes over the same table shape: `categorize` picks exactly
//! one label (mutually exclusive, count-based), `detect` returns every label
//! whose trigger occurs (non-exclusive). Matching is case-insensitive
//! substring containment in both modes. The tables are configuration data,
//! not algorithm; the defaults below reproduce the deployed lists.

/// Ordered (label, trigger substrings) table. Declaration order is
/// significant: it breaks categorization ties and orders detection output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordTable {
    entries: Vec<(String, Vec<String>)>,
}

impl KeywordTable {
    pub fn new<L, T>(entries: impl IntoIterator<Item = (L, Vec<T>)>) -> Self
    where
        L: Into<String>,
        T: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(label, triggers)| {
                    (label.into(), triggers.into_iter().map(Into::into).collect())
                })
                .collect(),
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(label, triggers)| (label.as_str(), triggers.as_slice()))
    }
}

/// Assigns exactly one category: the label with the most trigger hits.
/// Ties resolve to the earlier-declared label; no hits at all (or empty
/// input) yields "Other".
pub fn categorize(text: &str, table: &KeywordTable) -> String {
    let haystack = text.to_lowercase();
    if haystack.trim().is_empty() {
        return OTHER_CATEGORY.to_owned();
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, triggers) in table.rows() {
        let count = triggers.iter().filter(|trigger| haystack.contains(trigger.as_str())).count();
        // strictly-greater keeps the first-declared label on ties
        if count > 0 && best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }

    best.map_or_else(|| OTHER_CATEGORY.to_owned(), |(label, _)| label.to_owned())
}

/// Non-exclusive detection: every label whose trigger occurs, deduplicated,
/// in table order. Used for critical-issue matching where one comment can
/// raise several concerns.
pub fn detect(text: &str, table: &KeywordTable) -> Vec<String> {
    let haystack = text.to_lowercase();
    let mut matched: Vec<String> = Vec::new();
    for (label, triggers) in table.rows() {
        let hit = triggers.iter().any(|trigger| haystack.contains(trigger.as_str()));
        if hit && !matched.iter().any(|existing| existing == label) {
            matched.push(label.to_owned());
        }
    }
    matched
}

pub const OTHER_CATEGORY: &str = "Other";

/// Feedback categories in declaration order. "Other" carries no triggers
/// and only wins as the fallback.
pub fn default_category_table() -> KeywordTable {
    KeywordTable::new([
        (
            "Billing",
            vec![
                "bill", "invoice", "payment", "charge", "cost", "expensive", "insurance",
                "price", "refund",
            ],
        ),
        (
            "Staff",
            vec![
                "nurse", "doctor", "receptionist", "staff", "rude", "friendly", "helpful",
                "attitude", "behavior",
            ],
        ),
        (
            "Wait Time",
            vec!["wait", "delay", "hours", "slow", "time", "appointment", "queue", "schedule"],
        ),
        (
            "Facilities",
            vec!["clean", "dirty", "bathroom", "room", "parking", "facility", "equipment", "noise"],
        ),
        (
            "Treatment",
            vec![
                "medicine", "procedure", "treatment", "diagnosis", "prescription", "care",
                "pain", "surgery",
            ],
        ),
        (
            "Communication",
            vec!["explain", "told", "information", "informed", "understand", "clarity", "confused"],
        ),
        (OTHER_CATEGORY, vec![]),
    ])
}

/// Critical-issue labels keyed by the phrases that raise them. Several
/// triggers share one label; `detect` collapses the duplicates.
pub fn default_critical_table() -> KeywordTable {
    KeywordTable::new([
        ("Emergency response concerns", vec!["emergency"]),
        ("Potential mortality incident", vec!["died", "death"]),
        ("Potential medical error", vec!["mistake", "error"]),
        ("Medication error", vec!["wrong medication", "wrong medicine"]),
        ("Adverse reaction", vec!["allergic reaction"]),
        ("Patient safety incident", vec!["fall", "fell"]),
        ("Infection control issue", vec!["infection", "contamination", "unsanitary"]),
        ("Patient neglect concern", vec!["neglect", "ignored"]),
        ("Legal concern raised", vec!["lawsuit", "sue", "legal"]),
        ("Blood urgency or lack of Blood", vec!["blood"]),
        ("Immediate action or medication", vec!["urgent"]),
        ("Unresponsive patient care or staff negligence", vec!["unresponsive"]),
        ("Excessive or unmanaged bleeding reported", vec!["bleeding"]),
        ("Medication overdose incident", vec!["overdose"]),
        ("Patient left unattended for a long period", vec!["unattended"]),
        ("Possible contagious condition not isolated", vec!["contagious"]),
        ("Injury/fracture due to negligence", vec!["fracture"]),
        ("Delay in moving critical patient to ICU", vec!["icu delay"]),
        ("Potential misdiagnosis incident", vec!["misdiagnosed"]),
        ("Physical collapse or serious deterioration", vec!["collapsed"]),
        ("Oxygen supply issue", vec!["oxygen problem"]),
    ])
}

/// Recurring-issue descriptions for the common-issues summary.
pub fn default_issue_table() -> KeywordTable {
    KeywordTable::new([
        ("Long waiting times", vec!["wait", "delay"]),
        ("Billing and insurance issues", vec!["billing", "bill"]),
        ("Staff communication concerns", vec!["rude", "attitude"]),
        ("Facility cleanliness issues", vec!["dirty", "clean"]),
        ("Parking difficulties", vec!["parking"]),
        ("Communication clarity issues", vec!["confusion", "explain"]),
        ("Medication issues", vec!["medication", "prescription"]),
        ("Diagnosis accuracy", vec!["diagnosis"]),
        ("Appointment scheduling", vec!["appointment", "schedule"]),
    ])
}
