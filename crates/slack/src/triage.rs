use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use careloop_core::domain::feedback::{FeedbackId, FeedbackRecord};
use careloop_core::domain::notification::NotificationRecord;
use careloop_db::repositories::{
    FeedbackRepository, NotificationRepository, RepositoryError, UserRepository,
};

use crate::blocks::{
    acknowledged_message, patient_detail_message, reject_note_modal, rejected_message,
};
use crate::notify::{MessageRef, Notifier, NotifierError};

#[derive(Debug, Error)]
pub enum TriageError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notify(#[from] NotifierError),
    #[error("feedback record not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriageOutcome {
    Applied,
    /// The record was already in the requested terminal state; nothing was
    /// written.
    AlreadyResolved,
}

/// Handles the Acknowledge / View Details / Reject buttons on a posted
/// alert.
pub struct TriageService {
    feedback: Arc<dyn FeedbackRepository>,
    notifications: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
    alert_channel: String,
}

impl TriageService {
    pub fn new(
        feedback: Arc<dyn FeedbackRepository>,
        notifications: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        alert_channel: impl Into<String>,
    ) -> Self {
        Self { feedback, notifications, users, notifier, alert_channel: alert_channel.into() }
    }

    async fn load(&self, id: &FeedbackId) -> Result<FeedbackRecord, TriageError> {
        self.feedback
            .find_by_id(id)
            .await?
            .ok_or_else(|| TriageError::NotFound(id.0.clone()))
    }

    /// Acknowledge is idempotent: a second press finds the record already
    /// acknowledged and writes nothing, so the patient never receives a
    /// duplicate notification.
    pub async fn acknowledge(
        &self,
        id: &FeedbackId,
        actor_name: &str,
        source: &MessageRef,
    ) -> Result<TriageOutcome, TriageError> {
        let mut record = self.load(id).await?;
        if record.acknowledged {
            return Ok(TriageOutcome::AlreadyResolved);
        }

        self.feedback.set_acknowledged(id).await?;
        record.acknowledged = true;
        self.notifications
            .insert(NotificationRecord::acknowledged(&record, actor_name))
            .await?;
        self.notifier.update_message(source, &acknowledged_message(&record, actor_name)).await?;

        info!(feedback_id = %id.0, actor = actor_name, "alert acknowledged");
        Ok(TriageOutcome::Applied)
    }

    /// Read-only: posts the patient and feedback detail to the alert
    /// channel without changing triage state.
    pub async fn view(&self, id: &FeedbackId) -> Result<(), TriageError> {
        let record = self.load(id).await?;
        let profile = self
            .users
            .find_by_nhs_number(&record.nhs_number)
            .await?
            .ok_or_else(|| TriageError::NotFound(record.nhs_number.clone()))?;

        self.notifier
            .post_message(&self.alert_channel, &patient_detail_message(&profile, &record))
            .await?;
        Ok(())
    }

    /// Reject phase 1: open the note modal. The record must still exist,
    /// but no state changes until the note is submitted. The source message
    /// travels through the modal metadata so the submission can rewrite it.
    pub async fn open_rejection(
        &self,
        trigger_id: &str,
        id: &FeedbackId,
        source: &MessageRef,
    ) -> Result<(), TriageError> {
        self.load(id).await?;
        let metadata = encode_modal_metadata(id, source);
        self.notifier.open_modal(trigger_id, &reject_note_modal(&metadata)).await?;
        Ok(())
    }

    /// Reject phase 2: requires a non-empty note, then resolves the record
    /// and rewrites the alert message.
    pub async fn reject(
        &self,
        id: &FeedbackId,
        actor_name: &str,
        note: &str,
        source: &MessageRef,
    ) -> Result<TriageOutcome, TriageError> {
        let note = note.trim();
        if note.is_empty() {
            return Err(TriageError::Validation(
                "A note explaining the rejection is required.".to_string(),
            ));
        }

        let mut record = self.load(id).await?;
        if record.rejected {
            return Ok(TriageOutcome::AlreadyResolved);
        }

        self.feedback.set_rejected(id).await?;
        record.rejected = true;
        self.notifications
            .insert(NotificationRecord::rejected(&record, actor_name, note))
            .await?;
        self.notifier.update_message(source, &rejected_message(&record, actor_name, note)).await?;

        info!(feedback_id = %id.0, actor = actor_name, "alert rejected");
        Ok(TriageOutcome::Applied)
    }
}

/// Packs the feedback id and the alert message reference into the modal's
/// `private_metadata` field. Slack echoes it back verbatim on submission.
pub fn encode_modal_metadata(id: &FeedbackId, source: &MessageRef) -> String {
    format!("{}|{}|{}", id.0, source.channel, source.ts)
}

pub fn decode_modal_metadata(metadata: &str) -> Option<(FeedbackId, MessageRef)> {
    let mut parts = metadata.splitn(3, '|');
    let id = parts.next()?;
    let channel = parts.next()?;
    let ts = parts.next()?;
    if id.is_empty() || channel.is_empty() || ts.is_empty() {
        return None;
    }
    Some((
        FeedbackId(id.to_string()),
        MessageRef { channel: channel.to_string(), ts: ts.to_string() },
    ))
}
