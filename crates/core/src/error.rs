//! 에러 타입 — 도메인별 에러 정의

/// Scanwire 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ScanwireError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 이벤트 검증 에러
    #[error("event error: {0}")]
    Event(#[from] EventError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 이벤트 검증 에러
///
/// 변형(malformed) 이벤트는 파이프라인을 중단시키지 않습니다 —
/// 경고 로그와 함께 드롭되고 reducer에는 전달되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// 알 수 없는 종류, 필수 필드 누락, 범위 밖 값
    #[error("malformed event: {reason}")]
    Malformed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_error_display() {
        let err = EventError::Malformed {
            reason: "unknown event kind: nope".to_owned(),
        };
        assert_eq!(err.to_string(), "malformed event: unknown event kind: nope");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "general.log_level".to_owned(),
            reason: "must be one of: trace, debug, info, warn, error".to_owned(),
        };
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn scanwire_error_from_config() {
        let err: ScanwireError = ConfigError::FileNotFound {
            path: "/etc/scanwire/scanwire.toml".to_owned(),
        }
        .into();
        assert!(err.to_string().starts_with("config error"));
    }

    #[test]
    fn scanwire_error_from_event() {
        let err: ScanwireError = EventError::Malformed {
            reason: "missing event type tag".to_owned(),
        }
        .into();
        assert!(err.to_string().starts_with("event error"));
    }
}
