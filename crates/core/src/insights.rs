//! Aggregate reporting over saved feedback: the recurring-issues summary
//! shown to patients after saving, and the trend report the scheduler posts
//! to the care team channel.

use crate::classify::KeywordTable;
use crate::domain::feedback::FeedbackRecord;

/// Top-3 recurring issues across all comments. Counts raw (non-overlapping)
/// substring occurrences of each trigger in the concatenated, case-folded
/// corpus and sums them per issue description.
pub fn common_issues(comments: &[String], table: &KeywordTable) -> String {
    if comments.is_empty() {
        return "No feedback records found yet in the database.".to_owned();
    }

    let corpus = comments.join(" ").to_lowercase();
    let mut counts: Vec<(&str, usize)> = table
        .rows()
        .map(|(label, triggers)| {
            let total: usize =
                triggers.iter().map(|trigger| corpus.matches(trigger.as_str()).count()).sum();
            (label, total)
        })
        .collect();
    counts.retain(|(_, count)| *count > 0);
    if counts.is_empty() {
        return "No common issues identified from current feedback in the database.".to_owned();
    }

    // Stable sort keeps declaration order between equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(3);

    let mut summary = String::from("Top issues our team is actively working on:\n");
    for (position, (issue, count)) in counts.iter().enumerate() {
        summary.push_str(&format!("{}. {} ({} mentions)\n", position + 1, issue, count));
    }
    summary.trim_end().to_owned()
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrendReport {
    pub total: usize,
    /// Average rating rounded to two decimals; 0.0 when there is no feedback.
    pub average_rating: f64,
    /// Counts for ratings 1 through 5 inclusive, index 0 holding rating 1.
    pub distribution: [usize; 5],
    pub top_category: Option<String>,
}

/// Average, rating histogram and most-discussed category. Category ties
/// resolve to the one encountered first while tallying.
pub fn trend_report(records: &[FeedbackRecord]) -> TrendReport {
    let mut distribution = [0_usize; 5];
    let mut sum = 0_u64;
    for record in records {
        if (1..=5).contains(&record.rating) {
            distribution[usize::from(record.rating) - 1] += 1;
            sum += u64::from(record.rating);
        }
    }

    let total = records.len();
    let average_rating = if total == 0 {
        0.0
    } else {
        let raw = sum as f64 / total as f64;
        (raw * 100.0).round() / 100.0
    };

    let mut tally: Vec<(String, usize)> = Vec::new();
    for record in records {
        match tally.iter_mut().find(|(category, _)| *category == record.category) {
            Some((_, count)) => *count += 1,
            None => tally.push((record.category.clone(), 1)),
        }
    }
    let mut top_category: Option<(String, usize)> = None;
    for (category, count) in tally {
        // strictly-greater keeps the first-encountered category on ties
        if top_category.as_ref().map_or(true, |(_, best)| count > *best) {
            top_category = Some((category, count));
        }
    }
    let top_category = top_category.map(|(category, _)| category);

    TrendReport { total, average_rating, distribution, top_category }
}

impl TrendReport {
    pub fn render(&self) -> String {
        let mut report = format!(
            "Feedback trend summary:\n\
             Total feedback received: {}\n\
             Average satisfaction rating: {:.2}/5\n\
             Most discussed category: {}\n\
             Rating distribution:\n",
            self.total,
            self.average_rating,
            self.top_category.as_deref().unwrap_or("None"),
        );
        for (index, count) in self.distribution.iter().enumerate() {
            report.push_str(&format!("   - {}: {}\n", index + 1, count));
        }
        report.trim_end().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use crate::classify::default_issue_table;
    use crate::domain::feedback::FeedbackDraft;

    use super::{common_issues, trend_report};

    fn record(rating: u8, comments: &str, category: &str) -> crate::domain::feedback::FeedbackRecord {
        FeedbackDraft::new(
            Some("9434765919"),
            Some("Asha"),
            Some(rating),
            Some(comments),
            Some(category),
        )
        .expect("valid record")
        .into_record()
    }

    #[test]
    fn common_issues_lists_top_three_by_mention_count() {
        let comments = vec![
            "the wait was awful, wait and more wait".to_owned(),
            "billing was confusing and the bill was wrong".to_owned(),
            "parking was a nightmare".to_owned(),
            "another long wait".to_owned(),
        ];

        let summary = common_issues(&comments, &default_issue_table());
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Top issues our team is actively working on:");
        assert_eq!(lines[1], "1. Long waiting times (4 mentions)");
        // "billing" contains "bill" as a substring, so the two triggers sum.
        assert_eq!(lines[2], "2. Billing and insurance issues (3 mentions)");
        assert_eq!(lines[3], "3. Parking difficulties (1 mentions)");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn common_issues_reports_empty_corpora() {
        let summary = common_issues(&[], &default_issue_table());
        assert!(summary.contains("No feedback records"));

        let benign = vec!["lovely nurses".to_owned()];
        let summary = common_issues(&benign, &default_issue_table());
        assert!(summary.contains("No common issues identified"));
    }

    #[test]
    fn trend_report_averages_and_buckets_ratings() {
        let records = vec![
            record(2, "slow", "Wait Time"),
            record(4, "fine", "Staff"),
            record(4, "good", "Staff"),
        ];

        let report = trend_report(&records);
        assert_eq!(report.total, 3);
        assert_eq!(report.average_rating, 3.33);
        assert_eq!(report.distribution, [0, 1, 0, 2, 0]);
        assert_eq!(report.top_category.as_deref(), Some("Staff"));
    }

    #[test]
    fn trend_report_over_no_records_is_zeroed() {
        let report = trend_report(&[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.average_rating, 0.0);
        assert_eq!(report.distribution, [0; 5]);
        assert_eq!(report.top_category, None);
    }

    #[test]
    fn trend_category_tie_goes_to_first_encountered() {
        let records = vec![
            record(3, "a", "Billing"),
            record(3, "b", "Staff"),
            record(3, "c", "Staff"),
            record(3, "d", "Billing"),
        ];

        let report = trend_report(&records);
        assert_eq!(report.top_category.as_deref(), Some("Billing"));
    }

    #[test]
    fn render_matches_the_posted_format() {
        let records = vec![record(5, "great care", "Treatment")];
        let rendered = trend_report(&records).render();
        assert!(rendered.contains("Average satisfaction rating: 5.00/5"));
        assert!(rendered.contains("Most discussed category: Treatment"));
        assert!(rendered.contains("   - 5: 1"));
    }
}
