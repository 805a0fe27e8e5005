use chrono::{DateTime, Utc};
use sqlx::Row;

use careloop_core::domain::feedback::FeedbackId;
use careloop_core::domain::notification::{NotificationKind, NotificationRecord};

use super::{NotificationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_kind(s: &str) -> Result<NotificationKind, RepositoryError> {
    match s {
        "acknowledged" => Ok(NotificationKind::Acknowledged),
        "rejected" => Ok(NotificationKind::Rejected),
        other => Err(RepositoryError::Decode(format!("unknown notification kind: {other}"))),
    }
}

pub fn kind_as_str(kind: &NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Acknowledged => "acknowledged",
        NotificationKind::Rejected => "rejected",
    }
}

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<NotificationRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let nhs_number: String =
        row.try_get("nhs_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let feedback_id: String =
        row.try_get("feedback_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind_str: String =
        row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let message: String =
        row.try_get("message").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rejection_note: Option<String> =
        row.try_get("rejection_note").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comments_snapshot: String =
        row.try_get("comments_snapshot").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category_snapshot: String =
        row.try_get("category_snapshot").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rating_snapshot: i64 =
        row.try_get("rating_snapshot").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let read: bool = row.try_get("read").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let rating_snapshot = u8::try_from(rating_snapshot)
        .map_err(|_| RepositoryError::Decode(format!("rating out of range: {rating_snapshot}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("created_at: {e}")))?;

    Ok(NotificationRecord {
        id,
        nhs_number,
        feedback_id: FeedbackId(feedback_id),
        kind: parse_kind(&kind_str)?,
        message,
        rejection_note,
        comments_snapshot,
        category_snapshot,
        rating_snapshot,
        read,
        created_at,
    })
}

#[async_trait::async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn insert(&self, notification: NotificationRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO notifications (id, nhs_number, feedback_id, kind, message, rejection_note,
                                        comments_snapshot, category_snapshot, rating_snapshot,
                                        read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&notification.id)
        .bind(&notification.nhs_number)
        .bind(&notification.feedback_id.0)
        .bind(kind_as_str(&notification.kind))
        .bind(&notification.message)
        .bind(&notification.rejection_note)
        .bind(&notification.comments_snapshot)
        .bind(&notification.category_snapshot)
        .bind(i64::from(notification.rating_snapshot))
        .bind(notification.read)
        .bind(notification.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_patient(
        &self,
        nhs_number: &str,
    ) -> Result<Vec<NotificationRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, nhs_number, feedback_id, kind, message, rejection_note,
                    comments_snapshot, category_snapshot, rating_snapshot, read, created_at
             FROM notifications WHERE nhs_number = ? ORDER BY created_at DESC",
        )
        .bind(nhs_number)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_read_for_patient(&self, nhs_number: &str) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE nhs_number = ? AND read = 0")
                .bind(nhs_number)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
