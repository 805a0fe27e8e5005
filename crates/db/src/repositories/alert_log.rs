use chrono::Utc;
use sqlx::Row;

use careloop_core::domain::feedback::FeedbackId;

use super::{AlertLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAlertLogRepository {
    pool: DbPool,
}

impl SqlAlertLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AlertLogRepository for SqlAlertLogRepository {
    async fn exists(&self, feedback_id: &FeedbackId) -> Result<bool, RepositoryError> {
        let row =
            sqlx::query("SELECT COUNT(*) AS count FROM alert_log WHERE feedback_id = ?")
                .bind(&feedback_id.0)
                .fetch_one(&self.pool)
                .await?;
        let count: i64 = row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        Ok(count > 0)
    }

    async fn record(
        &self,
        feedback_id: &FeedbackId,
        matched_labels: &[String],
    ) -> Result<(), RepositoryError> {
        let labels = serde_json::to_string(matched_labels)
            .map_err(|e| RepositoryError::Decode(format!("matched_labels: {e}")))?;

        // Write-once: a second scan of the same record is a no-op.
        sqlx::query(
            "INSERT INTO alert_log (feedback_id, matched_labels, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(feedback_id) DO NOTHING",
        )
        .bind(&feedback_id.0)
        .bind(labels)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
