use async_trait::async_trait;
use thiserror::Error;

use careloop_core::domain::feedback::{FeedbackId, FeedbackRecord};
use careloop_core::domain::notification::NotificationRecord;
use careloop_core::domain::patient::PatientProfile;

pub mod alert_log;
pub mod feedback;
pub mod memory;
pub mod notification;
pub mod user;

pub use alert_log::SqlAlertLogRepository;
pub use feedback::SqlFeedbackRepository;
pub use memory::{
    InMemoryAlertLogRepository, InMemoryFeedbackRepository, InMemoryNotificationRepository,
    InMemoryUserRepository,
};
pub use notification::SqlNotificationRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_nhs_number(
        &self,
        nhs_number: &str,
    ) -> Result<Option<PatientProfile>, RepositoryError>;
    async fn save(&self, profile: PatientProfile) -> Result<(), RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn find_by_id(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, RepositoryError>;
    async fn insert(&self, record: FeedbackRecord) -> Result<(), RepositoryError>;
    async fn list_all(&self) -> Result<Vec<FeedbackRecord>, RepositoryError>;
    /// Candidates for the alert scan: not alerted, not acknowledged, not
    /// rejected, oldest first.
    async fn list_unalerted(&self) -> Result<Vec<FeedbackRecord>, RepositoryError>;
    /// Alerted records with critical issues that nobody has acknowledged
    /// or rejected yet, newest first.
    async fn list_critical_unacknowledged(&self)
        -> Result<Vec<FeedbackRecord>, RepositoryError>;
    /// Flips `alert_sent` and stores the matched labels, but only if the
    /// record has not been alerted yet. Returns whether the row
    /// transitioned; a `false` return means another scan got there first.
    async fn mark_alert_sent(
        &self,
        id: &FeedbackId,
        matched_labels: &[String],
    ) -> Result<bool, RepositoryError>;
    async fn set_acknowledged(&self, id: &FeedbackId) -> Result<(), RepositoryError>;
    async fn set_rejected(&self, id: &FeedbackId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: NotificationRecord) -> Result<(), RepositoryError>;
    async fn list_for_patient(
        &self,
        nhs_number: &str,
    ) -> Result<Vec<NotificationRecord>, RepositoryError>;
    /// Marks every notification for the patient as read; returns how many
    /// rows changed.
    async fn mark_read_for_patient(&self, nhs_number: &str) -> Result<u64, RepositoryError>;
}

/// Write-once dedup log consulted by the alert scan before posting.
#[async_trait]
pub trait AlertLogRepository: Send + Sync {
    async fn exists(&self, feedback_id: &FeedbackId) -> Result<bool, RepositoryError>;
    async fn record(
        &self,
        feedback_id: &FeedbackId,
        matched_labels: &[String],
    ) -> Result<(), RepositoryError>;
}
