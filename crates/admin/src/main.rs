//! CampusTrade Admin - campus marketplace administration console.
//!
//! This binary runs the console core: the dual-path backend gateway, the
//! bypass session heartbeat, the dashboard stats reconciler, and the
//! presence aggregator. A host surface (desktop shell or web frontend)
//! attaches to the shared state and channels; none of that rendering lives
//! here.
//!
//! # Security
//!
//! The bypass shared secret grants administrator-level mutations on the
//! backend. It is held only in the in-process credential store, redacted
//! from all `Debug` output, and torn down the moment the heartbeat reports
//! the session revoked.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_trade_admin::backend::{AdminBackend, BackendClient, DualPathBackend};
use campus_trade_admin::config::AdminConfig;
use campus_trade_admin::services::workflow::ApplicationStore;
use campus_trade_admin::services::{PresenceAggregator, SmsClient, StatsReconciler};
use campus_trade_admin::session::{CredentialStore, HeartbeatMonitor, SessionState};
use campus_trade_admin::state::AppState;

#[tokio::main]
async fn main() {
    let config = AdminConfig::from_env().expect("Failed to load configuration");

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campus_trade_admin=info".into());

    // Use JSON format on Fly.io for structured log parsing, text format locally
    let is_fly = std::env::var("FLY_APP_NAME").is_ok();
    let json_layer = is_fly.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_fly).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let client = BackendClient::new(&config.backend);
    let credentials = CredentialStore::new(config.bypass.clone());
    let backend = DualPathBackend::new(client.clone(), credentials.clone());
    let sms = config.sms().map(SmsClient::new);

    // Heartbeat: returns immediately when no bypass session is held.
    let (heartbeat, mut session_rx) = HeartbeatMonitor::new(client, credentials.clone());
    let heartbeat_task = heartbeat.spawn();

    // Dashboard reconciler; the first pass is the initial load.
    let (reconciler, _snapshot_rx) = StatsReconciler::with_period(
        backend.clone(),
        sms,
        Duration::from_secs(config.stats_poll_secs),
    );
    let stats_refresh = reconciler.refresh_handle();
    let stats_task = reconciler.spawn();

    // Presence: the realtime feed attaches to this sender; dropping it is
    // the unsubscribe.
    let (aggregator, _counts_rx, _notices_rx) = PresenceAggregator::new(config.operator_id);
    let (presence_tx, presence_rx) = tokio::sync::mpsc::channel(64);
    let presence_task = aggregator.spawn(presence_rx);

    let applications = ApplicationStore::default();
    let state = AppState::new(config, backend, credentials.clone(), applications, stats_refresh);

    // Initial application list; the store stays empty on failure and the
    // next explicit reload retries.
    match state.backend().list_applications(None).await {
        Ok(list) => state.applications().replace_all(list),
        Err(e) => tracing::warn!(error = %e, "Initial application load failed"),
    }

    tracing::info!("admin console core running");

    tokio::select! {
        () = shutdown_signal() => {}
        state = session_rx.wait_for(|s| matches!(s, SessionState::Revoked { .. })) => {
            if let Ok(state) = &state {
                if let SessionState::Revoked { reason } = &**state {
                    tracing::warn!(reason = %reason, "Bypass session revoked, shutting down");
                }
            }
        }
    }

    // Teardown: de-authenticate, detach the presence feed, stop the loops.
    credentials.clear();
    drop(presence_tx);
    stats_task.abort();
    heartbeat_task.abort();
    let _ = presence_task.await;

    tracing::info!("admin console core stopped");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
