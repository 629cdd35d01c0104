//! CLI argument definitions for scanwire-server.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Scanwire scan-event streaming server.
///
/// Serves the session API and the observer WebSocket channel, and
/// drives the scan engine for every created session.
#[derive(Parser, Debug)]
#[command(name = "scanwire-server")]
#[command(version, about, long_about = None)]
pub struct ServerCli {
    /// Path to scanwire.toml configuration file.
    #[arg(short, long, default_value = "scanwire.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override listen port (takes precedence over config file).
    #[arg(long)]
    pub port: Option<u16>,

    /// Validate configuration file and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let cli = ServerCli::parse_from(["scanwire-server"]);
        assert_eq!(cli.config, PathBuf::from("scanwire.toml"));
        assert!(cli.log_level.is_none());
        assert!(!cli.validate);
    }

    #[test]
    fn parses_overrides() {
        let cli = ServerCli::parse_from([
            "scanwire-server",
            "--config",
            "/etc/scanwire/scanwire.toml",
            "--log-level",
            "debug",
            "--port",
            "9000",
            "--validate",
        ]);
        assert_eq!(cli.config, PathBuf::from("/etc/scanwire/scanwire.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.port, Some(9000));
        assert!(cli.validate);
    }
}
