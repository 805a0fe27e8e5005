mod actions;
mod bootstrap;
mod chat;
mod health;
mod scheduler;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tracing::{info, warn};

use careloop_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use careloop_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    if app.config.scheduler.enabled {
        scheduler::spawn(
            app.config.scheduler.interval_secs,
            app.alerts.clone(),
            app.feedback.clone(),
            app.notifier.clone(),
            app.config.slack.alert_channel.clone(),
        );
    } else {
        info!("scheduler disabled by configuration");
    }

    let router = Router::new()
        .merge(chat::router(app.feedback_service.clone()))
        .merge(actions::router(actions::ActionsState {
            triage: app.triage.clone(),
            signing_secret: app.config.slack.signing_secret.clone(),
        }))
        .merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(bind_address = %address, "careloop-server started");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining connections");
    let _ = shutdown_tx.send(());

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => {
            warn!(
                grace_secs = app.config.server.graceful_shutdown_secs,
                "graceful shutdown timed out, aborting open connections"
            );
        }
    }

    info!("careloop-server stopped");
    Ok(())
}
