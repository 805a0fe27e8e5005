use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use careloop_core::classify::default_issue_table;
use careloop_core::insights::{common_issues, trend_report};
use careloop_db::repositories::FeedbackRepository;
use careloop_slack::alerts::AlertPipeline;
use careloop_slack::blocks::{trend_summary_message, MessageBuilder};
use careloop_slack::notify::Notifier;

/// Periodic reporting and alerting loop. Ticks that fire while a previous
/// tick is still running are skipped, not queued.
pub fn spawn(
    interval_secs: u64,
    alerts: Arc<AlertPipeline>,
    feedback: Arc<dyn FeedbackRepository>,
    notifier: Arc<dyn Notifier>,
    alert_channel: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let in_flight = Arc::new(AtomicBool::new(false));
        info!(interval_secs, "scheduler started");

        loop {
            interval.tick().await;
            if in_flight.swap(true, Ordering::SeqCst) {
                warn!("previous scheduler tick still running, skipping this one");
                continue;
            }

            let in_flight = in_flight.clone();
            let alerts = alerts.clone();
            let feedback = feedback.clone();
            let notifier = notifier.clone();
            let alert_channel = alert_channel.clone();
            tokio::spawn(async move {
                run_tick(&alerts, feedback.as_ref(), notifier.as_ref(), &alert_channel).await;
                in_flight.store(false, Ordering::SeqCst);
            });
        }
    })
}

/// One scheduler pass: trend report, recurring-issues summary, alert scan.
/// Each task fails independently; a bad report never blocks the scan.
async fn run_tick(
    alerts: &AlertPipeline,
    feedback: &dyn FeedbackRepository,
    notifier: &dyn Notifier,
    alert_channel: &str,
) {
    match feedback.list_all().await {
        Ok(records) => {
            let report = trend_report(&records).render();
            if let Err(error) =
                notifier.post_message(alert_channel, &trend_summary_message(&report)).await
            {
                warn!(error = %error, "failed to post trend summary");
            }

            let comments: Vec<String> =
                records.into_iter().map(|record| record.comments).collect();
            let summary = common_issues(&comments, &default_issue_table());
            let message = MessageBuilder::new("Recurring feedback issues")
                .section("trend.issues.v1", |section| {
                    section.mrkdwn(summary.clone());
                })
                .build();
            if let Err(error) = notifier.post_message(alert_channel, &message).await {
                warn!(error = %error, "failed to post recurring issues summary");
            }
        }
        Err(error) => warn!(error = %error, "could not load feedback for trend reporting"),
    }

    match alerts.scan().await {
        Ok(outcome) => info!(
            scanned = outcome.scanned,
            alerted = outcome.alerted,
            skipped = outcome.skipped,
            "alert scan completed"
        ),
        Err(error) => warn!(error = %error, "alert scan failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use careloop_core::domain::feedback::FeedbackDraft;
    use careloop_db::repositories::{
        FeedbackRepository, InMemoryAlertLogRepository, InMemoryFeedbackRepository,
    };
    use careloop_slack::alerts::AlertPipeline;
    use careloop_slack::notify::RecordingNotifier;

    use super::run_tick;

    fn record(comments: &str) -> careloop_core::FeedbackRecord {
        FeedbackDraft::new(
            Some("1234567890"),
            Some("Alex Morgan"),
            Some(1),
            Some(comments),
            Some("Treatment"),
        )
        .expect("valid draft")
        .into_record()
    }

    #[tokio::test]
    async fn tick_posts_reports_then_scans() {
        let feedback = Arc::new(InMemoryFeedbackRepository::default());
        let alert_log = Arc::new(InMemoryAlertLogRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let critical = record("patient collapsed in the corridor");
        feedback.insert(critical.clone()).await.expect("insert");

        let alerts = AlertPipeline::new(
            feedback.clone(),
            alert_log,
            notifier.clone(),
            "#patient-alerts",
        );
        run_tick(&alerts, feedback.as_ref(), notifier.as_ref(), "#patient-alerts").await;

        let posted = notifier.posted();
        assert_eq!(posted.len(), 3, "trend report, issues summary, then the alert");
        assert_eq!(posted[0].1.fallback_text, "Feedback trend summary");
        assert_eq!(posted[1].1.fallback_text, "Recurring feedback issues");

        let stored = feedback.find_by_id(&critical.id).await.expect("find").expect("exists");
        assert!(stored.alert_sent);
    }

    #[tokio::test]
    async fn tick_survives_notifier_failures() {
        let feedback = Arc::new(InMemoryFeedbackRepository::default());
        let alert_log = Arc::new(InMemoryAlertLogRepository::default());
        let notifier = Arc::new(RecordingNotifier::failing_posts());

        let critical = record("serious neglect overnight");
        feedback.insert(critical.clone()).await.expect("insert");

        let alerts = AlertPipeline::new(
            feedback.clone(),
            alert_log,
            notifier.clone(),
            "#patient-alerts",
        );
        run_tick(&alerts, feedback.as_ref(), notifier.as_ref(), "#patient-alerts").await;

        // Nothing was posted, and the record stays eligible for the next scan.
        assert!(notifier.posted().is_empty());
        let stored = feedback.find_by_id(&critical.id).await.expect("find").expect("exists");
        assert!(!stored.alert_sent);
    }
}
