use chrono::{DateTime, Utc};
use sqlx::Row;

use careloop_core::domain::feedback::{FeedbackId, FeedbackRecord};

use super::{FeedbackRepository, RepositoryError};
use crate::DbPool;

pub struct SqlFeedbackRepository {
    pool: DbPool,
}

impl SqlFeedbackRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, nhs_number, patient_name, rating, comments, category,
       alert_sent, acknowledged, rejected, critical_issues, created_at";

fn row_to_feedback(row: &sqlx::sqlite::SqliteRow) -> Result<FeedbackRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let nhs_number: String =
        row.try_get("nhs_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let patient_name: String =
        row.try_get("patient_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rating: i64 = row.try_get("rating").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comments: String =
        row.try_get("comments").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category: String =
        row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let alert_sent: bool =
        row.try_get("alert_sent").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let acknowledged: bool =
        row.try_get("acknowledged").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rejected: bool =
        row.try_get("rejected").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let critical_issues_json: String =
        row.try_get("critical_issues").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let rating = u8::try_from(rating)
        .map_err(|_| RepositoryError::Decode(format!("rating out of range: {rating}")))?;
    let critical_issues: Vec<String> = serde_json::from_str(&critical_issues_json)
        .map_err(|e| RepositoryError::Decode(format!("critical_issues: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("created_at: {e}")))?;

    Ok(FeedbackRecord {
        id: FeedbackId(id),
        nhs_number,
        patient_name,
        rating,
        comments,
        category,
        alert_sent,
        acknowledged,
        rejected,
        critical_issues,
        created_at,
    })
}

fn labels_to_json(labels: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(labels)
        .map_err(|e| RepositoryError::Decode(format!("critical_issues: {e}")))
}

#[async_trait::async_trait]
impl FeedbackRepository for SqlFeedbackRepository {
    async fn find_by_id(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM feedback WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_feedback(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, record: FeedbackRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO feedback (id, nhs_number, patient_name, rating, comments, category,
                                   alert_sent, acknowledged, rejected, critical_issues, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.nhs_number)
        .bind(&record.patient_name)
        .bind(i64::from(record.rating))
        .bind(&record.comments)
        .bind(&record.category)
        .bind(record.alert_sent)
        .bind(record.acknowledged)
        .bind(record.rejected)
        .bind(labels_to_json(&record.critical_issues)?)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM feedback ORDER BY created_at ASC"))
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_feedback).collect()
    }

    async fn list_unalerted(&self) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM feedback
             WHERE alert_sent = 0 AND acknowledged = 0 AND rejected = 0
             ORDER BY created_at ASC",
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_feedback).collect()
    }

    async fn list_critical_unacknowledged(
        &self,
    ) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM feedback
             WHERE critical_issues != '[]' AND acknowledged = 0 AND rejected = 0
             ORDER BY created_at DESC",
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_feedback).collect()
    }

    async fn mark_alert_sent(
        &self,
        id: &FeedbackId,
        matched_labels: &[String],
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE feedback SET alert_sent = 1, critical_issues = ?
             WHERE id = ? AND alert_sent = 0",
        )
        .bind(labels_to_json(matched_labels)?)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_acknowledged(&self, id: &FeedbackId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE feedback SET acknowledged = 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_rejected(&self, id: &FeedbackId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE feedback SET rejected = 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use careloop_core::domain::feedback::{FeedbackDraft, FeedbackId};

    use super::SqlFeedbackRepository;
    use crate::repositories::FeedbackRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn record(comments: &str) -> careloop_core::domain::feedback::FeedbackRecord {
        FeedbackDraft::new(
            Some("1234567890"),
            Some("Alex Morgan"),
            Some(2),
            Some(comments),
            Some("Staff"),
        )
        .expect("valid draft")
        .into_record()
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let pool = setup().await;
        let repo = SqlFeedbackRepository::new(pool);

        let saved = record("staff were rude");
        repo.insert(saved.clone()).await.expect("insert");

        let found = repo.find_by_id(&saved.id).await.expect("find").expect("exists");
        assert_eq!(found.comments, "staff were rude");
        assert_eq!(found.rating, 2);
        assert!(!found.alert_sent);
        assert!(found.critical_issues.is_empty());
    }

    #[tokio::test]
    async fn unalerted_listing_excludes_triaged_records() {
        let pool = setup().await;
        let repo = SqlFeedbackRepository::new(pool);

        let fresh = record("patient collapsed in the hallway");
        let alerted = record("an urgent problem");
        let acked = record("neglect concern");
        repo.insert(fresh.clone()).await.expect("insert fresh");
        repo.insert(alerted.clone()).await.expect("insert alerted");
        repo.insert(acked.clone()).await.expect("insert acked");

        repo.mark_alert_sent(&alerted.id, &["Immediate action or medication".to_string()])
            .await
            .expect("mark alerted");
        repo.set_acknowledged(&acked.id).await.expect("ack");

        let unalerted = repo.list_unalerted().await.expect("list");
        let ids: Vec<&str> = unalerted.iter().map(|r| r.id.0.as_str()).collect();
        assert_eq!(ids, vec![fresh.id.0.as_str()]);
    }

    #[tokio::test]
    async fn mark_alert_sent_is_conditional() {
        let pool = setup().await;
        let repo = SqlFeedbackRepository::new(pool);

        let saved = record("patient collapsed");
        repo.insert(saved.clone()).await.expect("insert");

        let labels = vec!["Physical collapse or serious deterioration".to_string()];
        assert!(repo.mark_alert_sent(&saved.id, &labels).await.expect("first mark"));
        assert!(!repo.mark_alert_sent(&saved.id, &labels).await.expect("second mark"));

        let found = repo.find_by_id(&saved.id).await.expect("find").expect("exists");
        assert!(found.alert_sent);
        assert_eq!(found.critical_issues, labels);

        let missing = repo
            .mark_alert_sent(&FeedbackId("nope".to_string()), &labels)
            .await
            .expect("missing mark");
        assert!(!missing);
    }

    #[tokio::test]
    async fn critical_unacknowledged_is_newest_first() {
        let pool = setup().await;
        let repo = SqlFeedbackRepository::new(pool);

        let mut older = record("patient collapsed");
        let mut newer = record("wrong medication given");
        older.created_at = chrono::Utc::now() - chrono::Duration::hours(2);
        newer.created_at = chrono::Utc::now();
        repo.insert(older.clone()).await.expect("insert older");
        repo.insert(newer.clone()).await.expect("insert newer");

        repo.mark_alert_sent(&older.id, &["Physical collapse or serious deterioration".into()])
            .await
            .expect("mark older");
        repo.mark_alert_sent(&newer.id, &["Medication error".into()])
            .await
            .expect("mark newer");

        let listed = repo.list_critical_unacknowledged().await.expect("list");
        let ids: Vec<&str> = listed.iter().map(|r| r.id.0.as_str()).collect();
        assert_eq!(ids, vec![newer.id.0.as_str(), older.id.0.as_str()]);

        repo.set_acknowledged(&newer.id).await.expect("ack newer");
        let listed = repo.list_critical_unacknowledged().await.expect("list after ack");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, older.id);
    }
}
