//! Shared server state -- hub, engine, and configuration handles.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use scanwire_core::config::ScanwireConfig;
use scanwire_event_hub::EventHub;
use scanwire_scan_engine::ScanEngine;

/// Application state shared by every request handler.
///
/// All fields are handles -- cloning the state is cheap, and tests can
/// build independent instances with their own hub and engine.
#[derive(Clone)]
pub struct AppState {
    /// Session registry, connection manager, and broadcaster.
    pub hub: EventHub,
    /// Event producer bound behind the emission contract.
    pub engine: Arc<dyn ScanEngine>,
    /// Loaded and validated configuration.
    pub config: Arc<ScanwireConfig>,
    /// Root cancellation token -- cancelled on server shutdown, every
    /// session producer runs on a child token.
    pub shutdown: CancellationToken,
    /// Server start time (for uptime reporting).
    pub started_at: Instant,
}

impl AppState {
    /// Build the state from configuration and an engine implementation.
    pub fn new(config: ScanwireConfig, engine: Arc<dyn ScanEngine>) -> Self {
        let hub = EventHub::builder()
            .limits(config.limits)
            .send_queue_capacity(config.server.send_queue_capacity)
            .event_queue_capacity(config.engine.event_queue_capacity)
            .build();
        Self {
            hub,
            engine,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use scanwire_scan_engine::SimScanEngine;

    use super::*;

    #[test]
    fn state_is_cheaply_cloneable() {
        let config = ScanwireConfig::default();
        let engine = Arc::new(SimScanEngine::new(config.engine.clone()));
        let state = AppState::new(config, engine);
        let clone = state.clone();
        assert!(Arc::ptr_eq(&state.config, &clone.config));
    }
}
