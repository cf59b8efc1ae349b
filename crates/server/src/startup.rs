use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use chrono::Utc;
use configs::AppConfig;
use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use service::notifications::PushNotifier;
use service::{calendar, runtime};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::errors::StartupError;
use crate::metrics::Metrics;
use crate::routes;
use crate::state::ServerState;

const REMINDER_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Send the weekly event reminders once a day, starting right away.
pub fn spawn_reminder_job(db: DatabaseConnection, notifier: Arc<dyn PushNotifier>, metrics: Arc<Metrics>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REMINDER_PERIOD);
        loop {
            ticker.tick().await;
            match calendar::send_event_reminders(&db, notifier.as_ref(), Utc::now()).await {
                Ok(sent) => {
                    metrics.reminders_sent_total.inc_by(sent as u64);
                    info!(service = "cultucat", event = "reminders_sent", sent, "reminder job finished");
                }
                Err(e) => error!(service = "cultucat", event = "reminders_failed", error = %e, "reminder job failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!(service = "cultucat", event = "shutdown_signal", "received Ctrl+C, shutting down");
}

/// Public entry: load config, migrate, build the app and serve until Ctrl+C.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;

    runtime::ensure_env(&cfg.media.dir)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    let db = models::db::connect_with_config(&cfg.database).await.context("connecting to the database")?;
    Migrator::up(&db, None).await.context("running migrations")?;
    info!(service = "cultucat", event = "migrations_applied", "schema up to date");

    let addr = bind_addr(&cfg)?;
    let state = ServerState::from_config(db, cfg)?;
    spawn_reminder_job(state.db.clone(), Arc::clone(&state.notifier), Arc::clone(&state.metrics));

    let app: Router = routes::build_router(state, build_cors());
    info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!(service = "cultucat", event = "stop", "server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_from_config() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "0.0.0.0".into();
        cfg.server.port = 9090;
        assert_eq!(bind_addr(&cfg).unwrap().to_string(), "0.0.0.0:9090");
        cfg.server.host = "not a host".into();
        assert!(bind_addr(&cfg).is_err());
    }
}
