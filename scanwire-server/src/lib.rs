//! Scanwire server library -- router assembly and background tasks.
//!
//! The binary entry point (`main.rs`) handles CLI parsing, config
//! loading, and signal handling; everything testable lives here.

pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod routes;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Assemble the full HTTP + WebSocket router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/scans", post(routes::create_scan).get(routes::list_scans))
        .route(
            "/api/scans/{id}",
            get(routes::get_scan).delete(routes::evict_scan),
        )
        .route("/health", get(routes::health))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Spawn the periodic heartbeat push task.
///
/// Pushes a `Heartbeat` event to every registered observer on its own
/// timer, independent of event production. Stops when the server
/// shutdown token fires.
pub fn spawn_heartbeat_push(state: &AppState) -> tokio::task::JoinHandle<()> {
    let hub = state.hub.clone();
    let shutdown = state.shutdown.clone();
    let period = Duration::from_secs(state.config.heartbeat.push_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the immediate first tick would race connection setup
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    hub.broadcast_heartbeat().await;
                }
                () = shutdown.cancelled() => {
                    tracing::debug!("heartbeat push task shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scanwire_core::config::ScanwireConfig;
    use scanwire_scan_engine::SimScanEngine;

    use super::*;

    #[test]
    fn router_builds() {
        let config = ScanwireConfig::default();
        let engine = Arc::new(SimScanEngine::new(config.engine.clone()));
        let state = AppState::new(config, engine);
        let _router = build_router(state);
    }

    #[tokio::test]
    async fn heartbeat_push_stops_on_shutdown() {
        let config = ScanwireConfig::default();
        let engine = Arc::new(SimScanEngine::new(config.engine.clone()));
        let state = AppState::new(config, engine);

        let handle = spawn_heartbeat_push(&state);
        state.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should stop on shutdown")
            .unwrap();
    }
}
