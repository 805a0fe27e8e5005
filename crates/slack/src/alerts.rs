use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use careloop_core::classify::{detect, KeywordTable};
use careloop_db::repositories::{AlertLogRepository, FeedbackRepository, RepositoryError};

use crate::blocks::critical_alert_message;
use crate::notify::Notifier;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub scanned: usize,
    pub alerted: usize,
    pub skipped: usize,
}

/// Scans fresh feedback for critical keywords and posts interactive alerts
/// to the care team channel.
pub struct AlertPipeline {
    feedback: Arc<dyn FeedbackRepository>,
    alert_log: Arc<dyn AlertLogRepository>,
    notifier: Arc<dyn Notifier>,
    alert_channel: String,
    critical_table: KeywordTable,
}

impl AlertPipeline {
    pub fn new(
        feedback: Arc<dyn FeedbackRepository>,
        alert_log: Arc<dyn AlertLogRepository>,
        notifier: Arc<dyn Notifier>,
        alert_channel: impl Into<String>,
    ) -> Self {
        Self {
            feedback,
            alert_log,
            notifier,
            alert_channel: alert_channel.into(),
            critical_table: careloop_core::classify::default_critical_table(),
        }
    }

    /// One pass over unalerted feedback. Per-record failures are logged and
    /// the scan continues; the database is only written after a confirmed
    /// send, so a failed post is retried on the next pass.
    pub async fn scan(&self) -> Result<ScanOutcome, AlertError> {
        let candidates = self.feedback.list_unalerted().await?;
        let mut outcome = ScanOutcome { scanned: candidates.len(), ..Default::default() };

        for record in candidates {
            let labels = detect(&record.comments, &self.critical_table);
            if labels.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            match self.alert_log.exists(&record.id).await {
                Ok(true) => {
                    outcome.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(error) => {
                    warn!(
                        feedback_id = %record.id.0,
                        error = %error,
                        "dedup lookup failed; will retry next scan"
                    );
                    continue;
                }
            }

            let message = critical_alert_message(&record, &labels);
            if let Err(error) = self.notifier.post_message(&self.alert_channel, &message).await {
                warn!(
                    feedback_id = %record.id.0,
                    error = %error,
                    "failed to post critical alert; will retry next scan"
                );
                continue;
            }

            match self.feedback.mark_alert_sent(&record.id, &labels).await {
                Ok(true) => {}
                Ok(false) => {
                    // Another scan alerted this record between list and mark.
                    outcome.skipped += 1;
                    continue;
                }
                Err(error) => {
                    warn!(
                        feedback_id = %record.id.0,
                        error = %error,
                        "could not mark alert sent after posting"
                    );
                    continue;
                }
            }
            if let Err(error) = self.alert_log.record(&record.id, &labels).await {
                // alert_sent is already set, so the record will not re-enter
                // the scan.
                warn!(
                    feedback_id = %record.id.0,
                    error = %error,
                    "could not write the dedup entry"
                );
            }

            info!(
                feedback_id = %record.id.0,
                labels = labels.len(),
                "critical alert posted"
            );
            outcome.alerted += 1;
        }

        Ok(outcome)
    }
}
