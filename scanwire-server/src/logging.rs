//! Logging initialization for scanwire-server.
//!
//! Builds the global `tracing-subscriber` from the `[general]` config
//! section. `RUST_LOG` takes precedence over the configured level, so
//! operators can raise verbosity per-module without touching the file.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use scanwire_core::config::GeneralConfig;

/// Supported log output formats.
enum LogFormat {
    /// Machine-parseable JSON lines (default for production).
    Json,
    /// Human-readable colored output (for development).
    Pretty,
}

impl LogFormat {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            )),
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    match LogFormat::parse(&config.log_format)? {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}
