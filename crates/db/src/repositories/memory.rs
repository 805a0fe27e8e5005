use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use careloop_core::domain::feedback::{FeedbackId, FeedbackRecord};
use careloop_core::domain::notification::NotificationRecord;
use careloop_core::domain::patient::PatientProfile;

use super::{
    AlertLogRepository, FeedbackRepository, NotificationRepository, RepositoryError,
    UserRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, PatientProfile>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_nhs_number(
        &self,
        nhs_number: &str,
    ) -> Result<Option<PatientProfile>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(nhs_number).cloned())
    }

    async fn save(&self, profile: PatientProfile) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(profile.nhs_number.clone(), profile);
        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryFeedbackRepository {
    records: RwLock<HashMap<String, FeedbackRecord>>,
}

impl InMemoryFeedbackRepository {
    async fn sorted(&self, newest_first: bool) -> Vec<FeedbackRecord> {
        let records = self.records.read().await;
        let mut all: Vec<FeedbackRecord> = records.values().cloned().collect();
        all.sort_by_key(|record| record.created_at);
        if newest_first {
            all.reverse();
        }
        all
    }
}

#[async_trait::async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn find_by_id(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&id.0).cloned())
    }

    async fn insert(&self, record: FeedbackRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(record.id.0.clone(), record);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        Ok(self.sorted(false).await)
    }

    async fn list_unalerted(&self) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        Ok(self
            .sorted(false)
            .await
            .into_iter()
            .filter(|record| !record.alert_sent && !record.acknowledged && !record.rejected)
            .collect())
    }

    async fn list_critical_unacknowledged(&self) -> Result<Vec<FeedbackRecord>, RepositoryError> {
        Ok(self
            .sorted(true)
            .await
            .into_iter()
            .filter(|record| {
                !record.critical_issues.is_empty() && !record.acknowledged && !record.rejected
            })
            .collect())
    }

    async fn mark_alert_sent(
        &self,
        id: &FeedbackId,
        matched_labels: &[String],
    ) -> Result<bool, RepositoryError> {
        let mut records = self.records.write().await;
        match records.get_mut(&id.0) {
            Some(record) if !record.alert_sent => {
                record.alert_sent = true;
                record.critical_issues = matched_labels.to_vec();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_acknowledged(&self, id: &FeedbackId) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&id.0) {
            record.acknowledged = true;
        }
        Ok(())
    }

    async fn set_rejected(&self, id: &FeedbackId) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&id.0) {
            record.rejected = true;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<Vec<NotificationRecord>>,
}

#[async_trait::async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(&self, notification: NotificationRecord) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.write().await;
        notifications.push(notification);
        Ok(())
    }

    async fn list_for_patient(
        &self,
        nhs_number: &str,
    ) -> Result<Vec<NotificationRecord>, RepositoryError> {
        let notifications = self.notifications.read().await;
        let mut matching: Vec<NotificationRecord> = notifications
            .iter()
            .filter(|notification| notification.nhs_number == nhs_number)
            .cloned()
            .collect();
        matching.sort_by_key(|notification| std::cmp::Reverse(notification.created_at));
        Ok(matching)
    }

    async fn mark_read_for_patient(&self, nhs_number: &str) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        let mut changed = 0;
        for notification in notifications.iter_mut() {
            if notification.nhs_number == nhs_number && !notification.read {
                notification.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[derive(Default)]
pub struct InMemoryAlertLogRepository {
    entries: RwLock<HashSet<String>>,
}

#[async_trait::async_trait]
impl AlertLogRepository for InMemoryAlertLogRepository {
    async fn exists(&self, feedback_id: &FeedbackId) -> Result<bool, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.contains(&feedback_id.0))
    }

    async fn record(
        &self,
        feedback_id: &FeedbackId,
        _matched_labels: &[String],
    ) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.insert(feedback_id.0.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use careloop_core::domain::feedback::{FeedbackDraft, FeedbackRecord};
    use careloop_core::domain::notification::NotificationRecord;
    use careloop_core::domain::patient::PatientProfile;

    use crate::repositories::{
        FeedbackRepository, InMemoryFeedbackRepository, InMemoryNotificationRepository,
        InMemoryUserRepository, NotificationRepository, UserRepository,
    };

    fn record(rating: u8, comments: &str) -> FeedbackRecord {
        FeedbackDraft::new(
            Some("1234567890"),
            Some("Alex Morgan"),
            Some(rating),
            Some(comments),
            Some("Other"),
        )
        .expect("valid draft")
        .into_record()
    }

    #[tokio::test]
    async fn user_repo_round_trip() {
        let repo = InMemoryUserRepository::default();
        let profile = PatientProfile {
            nhs_number: "1234567890".to_string(),
            name: "Alex Morgan".to_string(),
            age: 30,
            gender: "Male".to_string(),
            treatment: "Outpatient".to_string(),
            date_of_treatment: "2024-04-10".to_string(),
            health_issue: "Hypertension".to_string(),
        };

        repo.save(profile.clone()).await.expect("save");
        let found = repo.find_by_nhs_number("1234567890").await.expect("find");

        assert_eq!(found.expect("exists").name, "Alex Morgan");
        assert_eq!(repo.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn feedback_repo_mirrors_sql_semantics() {
        let repo = InMemoryFeedbackRepository::default();
        let saved = record(2, "patient collapsed");
        repo.insert(saved.clone()).await.expect("insert");

        let labels = vec!["Physical collapse or serious deterioration".to_string()];
        assert!(repo.mark_alert_sent(&saved.id, &labels).await.expect("first mark"));
        assert!(!repo.mark_alert_sent(&saved.id, &labels).await.expect("second mark"));

        assert!(repo.list_unalerted().await.expect("unalerted").is_empty());
        let critical = repo.list_critical_unacknowledged().await.expect("critical");
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].critical_issues, labels);

        repo.set_acknowledged(&saved.id).await.expect("ack");
        assert!(repo.list_critical_unacknowledged().await.expect("critical after").is_empty());
    }

    #[tokio::test]
    async fn notification_repo_marks_read_once() {
        let repo = InMemoryNotificationRepository::default();
        let feedback = record(1, "urgent issue");

        repo.insert(NotificationRecord::acknowledged(&feedback, "Dr. Reeves"))
            .await
            .expect("insert ack");
        repo.insert(NotificationRecord::rejected(&feedback, "Dr. Reeves", "Duplicate report"))
            .await
            .expect("insert rej");

        let listed = repo.list_for_patient("1234567890").await.expect("list");
        assert_eq!(listed.len(), 2);

        assert_eq!(repo.mark_read_for_patient("1234567890").await.expect("mark"), 2);
        assert_eq!(repo.mark_read_for_patient("1234567890").await.expect("mark again"), 0);
    }
}
