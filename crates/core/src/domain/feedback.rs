use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedbackId(pub String);

impl FeedbackId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A saved piece of patient feedback. Created once with rating, comments
/// and category all present; afterwards only the triage flags and the
/// critical-issue snapshot change. Records are never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: FeedbackId,
    pub nhs_number: String,
    pub patient_name: String,
    pub rating: u8,
    pub comments: String,
    pub category: String,
    pub alert_sent: bool,
    pub acknowledged: bool,
    pub rejected: bool,
    /// Critical-issue labels matched at alert time, in detection order.
    /// Empty until the alert pipeline processes the record.
    pub critical_issues: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for a new record. `new` is the single gate through
/// which the conversation flow persists feedback; it refuses partial
/// drafts rather than letting them reach storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedbackDraft {
    pub nhs_number: String,
    pub patient_name: String,
    pub rating: u8,
    pub comments: String,
    pub category: String,
}

impl FeedbackDraft {
    pub fn new(
        nhs_number: Option<&str>,
        patient_name: Option<&str>,
        rating: Option<u8>,
        comments: Option<&str>,
        category: Option<&str>,
    ) -> Result<Self, CoreError> {
        let mut missing = Vec::new();
        if nhs_number.map_or(true, |value| value.trim().is_empty()) {
            missing.push("nhs_number".to_owned());
        }
        if patient_name.map_or(true, |value| value.trim().is_empty()) {
            missing.push("patient_name".to_owned());
        }
        if rating.is_none() {
            missing.push("rating".to_owned());
        }
        if comments.map_or(true, |value| value.trim().is_empty()) {
            missing.push("comments".to_owned());
        }
        if category.map_or(true, |value| value.trim().is_empty()) {
            missing.push("category".to_owned());
        }
        if !missing.is_empty() {
            return Err(CoreError::missing_fields(missing));
        }

        let rating = rating.unwrap_or_default();
        if !(1..=5).contains(&rating) {
            return Err(CoreError::Validation {
                message: format!("rating must be between 1 and 5, got {rating}"),
                missing: Vec::new(),
            });
        }

        Ok(Self {
            nhs_number: nhs_number.unwrap_or_default().trim().to_owned(),
            patient_name: patient_name.unwrap_or_default().trim().to_owned(),
            rating,
            comments: comments.unwrap_or_default().trim().to_owned(),
            category: category.unwrap_or_default().to_owned(),
        })
    }

    pub fn into_record(self) -> FeedbackRecord {
        FeedbackRecord {
            id: FeedbackId::generate(),
            nhs_number: self.nhs_number,
            patient_name: self.patient_name,
            rating: self.rating,
            comments: self.comments,
            category: self.category,
            alert_sent: false,
            acknowledged: false,
            rejected: false,
            critical_issues: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::CoreError;

    use super::FeedbackDraft;

    #[test]
    fn complete_draft_becomes_a_fresh_record() {
        let draft = FeedbackDraft::new(
            Some("9434765919"),
            Some("Asha Patel"),
            Some(2),
            Some("The wait was too long and staff were rude."),
            Some("Staff"),
        )
        .expect("draft is complete");

        let record = draft.into_record();
        assert_eq!(record.rating, 2);
        assert!(!record.alert_sent);
        assert!(!record.acknowledged);
        assert!(!record.rejected);
        assert!(record.critical_issues.is_empty());
        assert!(!record.id.0.is_empty());
    }

    #[test]
    fn partial_draft_names_every_missing_field() {
        let error = FeedbackDraft::new(Some("9434765919"), None, None, Some("ok visit"), None)
            .expect_err("draft is incomplete");

        match error {
            CoreError::Validation { missing, .. } => {
                assert_eq!(missing, vec!["patient_name", "rating", "category"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_comments_count_as_missing() {
        let error = FeedbackDraft::new(
            Some("9434765919"),
            Some("Asha Patel"),
            Some(4),
            Some("   "),
            Some("Other"),
        )
        .expect_err("blank comments rejected");

        assert!(matches!(error, CoreError::Validation { missing, .. } if missing == ["comments"]));
    }

    #[test]
    fn out_of_range_rating_is_rejected() {
        let error = FeedbackDraft::new(
            Some("9434765919"),
            Some("Asha Patel"),
            Some(6),
            Some("fine"),
            Some("Other"),
        )
        .expect_err("rating above 5 rejected");

        assert!(matches!(error, CoreError::Validation { .. }));
    }
}
