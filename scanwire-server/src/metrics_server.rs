//! Prometheus scrape endpoint.
//!
//! Installs the global `metrics` recorder with the HTTP listener built
//! into `metrics-exporter-prometheus`, then registers every metric
//! description from `scanwire_core::metrics`. Gated behind
//! `[metrics] enabled` in the config; call once per process.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

use scanwire_core::config::MetricsConfig;

/// Resolve and sanity-check the scrape listener address.
fn scrape_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    if config.endpoint != "/metrics" {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '/metrics' is currently supported",
            config.endpoint
        ));
    }
    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}

/// Install the global metrics recorder and start the HTTP listener.
///
/// # Errors
///
/// - The endpoint or listen address is invalid
/// - Socket binding fails
/// - A global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = scrape_addr(config)?;
    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;
    scanwire_core::metrics::describe_all();

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_custom_endpoint() {
        let mut config = MetricsConfig::default();
        config.endpoint = "/stats".to_owned();
        let err = scrape_addr(&config).unwrap_err();
        assert!(err.to_string().contains("unsupported metrics endpoint"));
    }

    #[test]
    fn resolves_default_address() {
        let config = MetricsConfig::default();
        let addr = scrape_addr(&config).unwrap();
        assert_eq!(addr.port(), 9090);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn rejects_bad_listen_addr() {
        let mut config = MetricsConfig::default();
        config.listen_addr = "not an address".to_owned();
        assert!(scrape_addr(&config).is_err());
    }
}
