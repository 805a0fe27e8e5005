use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use careloop_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Opens the feedback store with the runtime settings from `[database]`.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

/// Pool tuned for sqlite's single-writer model. WAL keeps chat inserts
/// from blocking the alert scanner's reads, and the busy timeout follows
/// the acquire timeout so a held write lock surfaces the same way an
/// exhausted pool does.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let acquire_timeout = Duration::from_secs(timeout_secs.max(1));
    let busy_timeout_ms = acquire_timeout.as_millis().min(10_000);

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(acquire_timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let pragmas = format!(
                    "PRAGMA foreign_keys = ON; \
                     PRAGMA journal_mode = WAL; \
                     PRAGMA busy_timeout = {busy_timeout_ms};"
                );
                sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&pragmas)).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
