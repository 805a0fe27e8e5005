use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use careloop_agent::FeedbackService;
use careloop_core::config::{AppConfig, ConfigError, LoadOptions};
use careloop_db::repositories::{
    AlertLogRepository, FeedbackRepository, NotificationRepository, RepositoryError,
    SqlAlertLogRepository, SqlFeedbackRepository, SqlNotificationRepository, SqlUserRepository,
    UserRepository,
};
use careloop_db::{connect, migrations, seed_sample_patients, DbPool};
use careloop_slack::alerts::AlertPipeline;
use careloop_slack::notify::{Notifier, SlackNotifier};
use careloop_slack::triage::TriageService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub feedback: Arc<dyn FeedbackRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub feedback_service: Arc<FeedbackService>,
    pub triage: Arc<TriageService>,
    pub alerts: Arc<AlertPipeline>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("sample data seeding failed: {0}")]
    Seed(#[from] RepositoryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!("database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!("database migrations applied");

    let users: Arc<dyn UserRepository> = Arc::new(SqlUserRepository::new(db_pool.clone()));
    let feedback: Arc<dyn FeedbackRepository> =
        Arc::new(SqlFeedbackRepository::new(db_pool.clone()));
    let notifications: Arc<dyn NotificationRepository> =
        Arc::new(SqlNotificationRepository::new(db_pool.clone()));
    let alert_log: Arc<dyn AlertLogRepository> =
        Arc::new(SqlAlertLogRepository::new(db_pool.clone()));

    if config.database.seed_sample_patients {
        let seeded = seed_sample_patients(users.as_ref()).await?;
        if seeded > 0 {
            info!(seeded, "sample patients seeded");
        }
    }

    let notifier: Arc<dyn Notifier> = Arc::new(SlackNotifier::new(config.slack.bot_token.clone()));

    let feedback_service = Arc::new(FeedbackService::new(users.clone(), feedback.clone()));
    let triage = Arc::new(TriageService::new(
        feedback.clone(),
        notifications,
        users,
        notifier.clone(),
        config.slack.alert_channel.clone(),
    ));
    let alerts = Arc::new(AlertPipeline::new(
        feedback.clone(),
        alert_log,
        notifier.clone(),
        config.slack.alert_channel.clone(),
    ));

    Ok(Application { config, db_pool, feedback, notifier, feedback_service, triage, alerts })
}

#[cfg(test)]
mod tests {
    use careloop_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                slack_signing_secret: Some("secret-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_required_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                slack_bot_token: Some("invalid-token".to_string()),
                slack_signing_secret: Some("secret-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_seeds_sample_patients() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('users', 'feedback', 'notifications', 'alert_log')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected foundation tables to be available after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose the feedback-path tables");

        let (patient_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&app.db_pool)
            .await
            .expect("count users");
        assert!(patient_count > 0, "seeding should insert the sample patients");

        let greeting =
            app.feedback_service.start_session("1234567890").await.expect("seeded patient");
        assert!(greeting.greeting.contains("Alex Morgan"));

        app.db_pool.close().await;
    }
}
