//! CLI-specific error types and exit code mapping

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Cannot reach the scanwire server.
    #[error("server not reachable: {0}")]
    ServerUnavailable(String),

    /// The server rejected the request (bad target, unknown session).
    #[error("{0}")]
    Api(String),

    /// Referenced session does not exist.
    #[error("unknown session: {0}")]
    NotFound(String),

    /// The live channel closed or produced an unexpected frame.
    #[error("stream error: {0}")]
    Stream(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning              |
    /// |------|----------------------|
    /// | 0    | Success              |
    /// | 1    | General / API error  |
    /// | 2    | Session not found    |
    /// | 3    | Server unreachable   |
    /// | 10   | IO error             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound(_) => 2,
            Self::ServerUnavailable(_) => 3,
            Self::Io(_) => 10,
            Self::Api(_) | Self::Stream(_) | Self::JsonSerialize(_) => 1,
        }
    }
}

impl From<reqwest::Error> for CliError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::ServerUnavailable(e.to_string())
        } else {
            Self::Api(e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CliError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Stream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(CliError::NotFound("s".to_owned()).exit_code(), 2);
        assert_eq!(CliError::ServerUnavailable("x".to_owned()).exit_code(), 3);
        assert_eq!(CliError::Api("x".to_owned()).exit_code(), 1);
    }
}
