use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::feedback::{FeedbackId, FeedbackRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Acknowledged,
    Rejected,
}

/// Patient-facing outcome record written by the triage callback when a
/// clinician acknowledges or rejects an alert. Carries a snapshot of the
/// triggering feedback so later edits to keyword tables or records cannot
/// rewrite what the patient was told. Only the `read` flag ever changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub nhs_number: String,
    pub feedback_id: FeedbackId,
    pub kind: NotificationKind,
    pub message: String,
    pub rejection_note: Option<String>,
    pub comments_snapshot: String,
    pub category_snapshot: String,
    pub rating_snapshot: u8,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn acknowledged(feedback: &FeedbackRecord, actor_name: &str) -> Self {
        Self::build(
            feedback,
            NotificationKind::Acknowledged,
            format!(
                "Your feedback has been reviewed and acknowledged by {actor_name}. \
                 The care team is looking into it."
            ),
            None,
        )
    }

    pub fn rejected(feedback: &FeedbackRecord, actor_name: &str, note: &str) -> Self {
        Self::build(
            feedback,
            NotificationKind::Rejected,
            format!("Your feedback was reviewed by {actor_name}: {note}"),
            Some(note.to_owned()),
        )
    }

    fn build(
        feedback: &FeedbackRecord,
        kind: NotificationKind,
        message: String,
        rejection_note: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            nhs_number: feedback.nhs_number.clone(),
            feedback_id: feedback.id.clone(),
            kind,
            message,
            rejection_note,
            comments_snapshot: feedback.comments.clone(),
            category_snapshot: feedback.category.clone(),
            rating_snapshot: feedback.rating,
            read: false,
            created_at: Utc::now(),
        }
    }
}
