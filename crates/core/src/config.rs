//! 설정 관리 — scanwire.toml 파싱 및 런타임 설정
//!
//! [`ScanwireConfig`]는 서버와 엔진 전체의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SCANWIRE_SERVER_PORT=8081` 형식)
//! 3. 설정 파일 (`scanwire.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), scanwire_core::error::ScanwireError> {
//! use scanwire_core::config::ScanwireConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ScanwireConfig::load("scanwire.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ScanwireConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ScanwireError};
use crate::snapshot::LogLimits;

/// Scanwire 통합 설정
///
/// `scanwire.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanwireConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// HTTP/WebSocket 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// observer 연결 하트비트 설정
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    /// 시뮬레이션 엔진 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 유계 로그 보존 개수
    #[serde(default)]
    pub limits: LogLimits,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// HTTP/WebSocket 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인드 주소
    pub listen_addr: String,
    /// 바인드 포트
    pub port: u16,
    /// observer당 송신 큐 용량 — 가득 차면 메시지가 드롭됩니다
    pub send_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_owned(),
            port: 8080,
            send_queue_capacity: 256,
        }
    }
}

/// observer 연결 하트비트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// liveness 점검 주기 (초)
    pub interval_secs: u64,
    /// 응답 없는 연결을 dead로 판정하기까지의 시간 (초)
    pub timeout_secs: u64,
    /// 서버가 Heartbeat 이벤트를 push하는 주기 (초)
    pub push_interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            timeout_secs: 30,
            push_interval_secs: 30,
        }
    }
}

/// 시뮬레이션 엔진 설정
///
/// 실제 스캔 엔진을 연결하면 이 섹션은 사용되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 틱 간격 최소값 (밀리초)
    pub tick_min_ms: u64,
    /// 틱 간격 최대값 (밀리초)
    pub tick_max_ms: u64,
    /// 틱당 최대 진행률 증가량
    pub max_progress_step: u8,
    /// 틱당 발견 사항 방출 확률 (0.0..=1.0)
    pub finding_probability: f64,
    /// 발견 사항 방출이 시작되는 진행률 하한
    pub finding_threshold_percent: u8,
    /// 세션별 이벤트 큐 용량
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_min_ms: 2000,
            tick_max_ms: 5000,
            max_progress_step: 20,
            finding_probability: 0.3,
            finding_threshold_percent: 30,
            event_queue_capacity: 256,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 메트릭 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 메트릭 리스너 바인드 주소
    pub listen_addr: String,
    /// 메트릭 리스너 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9090,
            endpoint: "/metrics".to_owned(),
        }
    }
}

impl ScanwireConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScanwireError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ScanwireError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScanwireError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScanwireError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ScanwireError> {
        toml::from_str(toml_str).map_err(|e| {
            ScanwireError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SCANWIRE_{SECTION}_{FIELD}`
    /// 예: `SCANWIRE_SERVER_PORT=8081`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SCANWIRE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SCANWIRE_GENERAL_LOG_FORMAT");

        // Server
        override_string(&mut self.server.listen_addr, "SCANWIRE_SERVER_LISTEN_ADDR");
        override_u16(&mut self.server.port, "SCANWIRE_SERVER_PORT");
        override_usize(
            &mut self.server.send_queue_capacity,
            "SCANWIRE_SERVER_SEND_QUEUE_CAPACITY",
        );

        // Heartbeat
        override_u64(
            &mut self.heartbeat.interval_secs,
            "SCANWIRE_HEARTBEAT_INTERVAL_SECS",
        );
        override_u64(
            &mut self.heartbeat.timeout_secs,
            "SCANWIRE_HEARTBEAT_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.heartbeat.push_interval_secs,
            "SCANWIRE_HEARTBEAT_PUSH_INTERVAL_SECS",
        );

        // Engine
        override_u64(&mut self.engine.tick_min_ms, "SCANWIRE_ENGINE_TICK_MIN_MS");
        override_u64(&mut self.engine.tick_max_ms, "SCANWIRE_ENGINE_TICK_MAX_MS");
        override_u8(
            &mut self.engine.max_progress_step,
            "SCANWIRE_ENGINE_MAX_PROGRESS_STEP",
        );
        override_f64(
            &mut self.engine.finding_probability,
            "SCANWIRE_ENGINE_FINDING_PROBABILITY",
        );
        override_u8(
            &mut self.engine.finding_threshold_percent,
            "SCANWIRE_ENGINE_FINDING_THRESHOLD_PERCENT",
        );
        override_usize(
            &mut self.engine.event_queue_capacity,
            "SCANWIRE_ENGINE_EVENT_QUEUE_CAPACITY",
        );

        // Limits
        override_usize(&mut self.limits.tool_activity, "SCANWIRE_LIMITS_TOOL_ACTIVITY");
        override_usize(&mut self.limits.insights, "SCANWIRE_LIMITS_INSIGHTS");
        override_usize(&mut self.limits.chains, "SCANWIRE_LIMITS_CHAINS");
        override_usize(
            &mut self.limits.recent_findings,
            "SCANWIRE_LIMITS_RECENT_FINDINGS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "SCANWIRE_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "SCANWIRE_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "SCANWIRE_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "SCANWIRE_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ScanwireError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 하트비트 검증 — timeout은 점검 주기보다 길어야 합니다
        if self.heartbeat.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat.interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }
        if self.heartbeat.timeout_secs < self.heartbeat.interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat.timeout_secs".to_owned(),
                reason: "must be >= heartbeat.interval_secs".to_owned(),
            }
            .into());
        }

        // 엔진 검증
        if self.engine.tick_min_ms == 0 || self.engine.tick_min_ms > self.engine.tick_max_ms {
            return Err(ConfigError::InvalidValue {
                field: "engine.tick_min_ms".to_owned(),
                reason: "must be > 0 and <= engine.tick_max_ms".to_owned(),
            }
            .into());
        }
        if self.engine.max_progress_step == 0 || self.engine.max_progress_step > 100 {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_progress_step".to_owned(),
                reason: "must be in 1..=100".to_owned(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.engine.finding_probability) {
            return Err(ConfigError::InvalidValue {
                field: "engine.finding_probability".to_owned(),
                reason: "must be in 0.0..=1.0".to_owned(),
            }
            .into());
        }
        if self.engine.finding_threshold_percent > 100 {
            return Err(ConfigError::InvalidValue {
                field: "engine.finding_threshold_percent".to_owned(),
                reason: "must be in 0..=100".to_owned(),
            }
            .into());
        }
        if self.engine.event_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.event_queue_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        // 유계 로그 검증
        if self.limits.tool_activity == 0
            || self.limits.insights == 0
            || self.limits.chains == 0
            || self.limits.recent_findings == 0
        {
            return Err(ConfigError::InvalidValue {
                field: "limits".to_owned(),
                reason: "all retention limits must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, key: &str) {
    if let Ok(value) = std::env::var(key) {
        *target = value;
    }
}

fn override_bool(target: &mut bool, key: &str) {
    if let Ok(value) = std::env::var(key) {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => *target = true,
            "false" | "0" | "no" => *target = false,
            _ => tracing::warn!(key, value, "ignoring invalid boolean env override"),
        }
    }
}

fn override_u8(target: &mut u8, key: &str) {
    if let Ok(value) = std::env::var(key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(key, value, "ignoring invalid integer env override"),
        }
    }
}

fn override_u16(target: &mut u16, key: &str) {
    if let Ok(value) = std::env::var(key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(key, value, "ignoring invalid integer env override"),
        }
    }
}

fn override_u64(target: &mut u64, key: &str) {
    if let Ok(value) = std::env::var(key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(key, value, "ignoring invalid integer env override"),
        }
    }
}

fn override_usize(target: &mut usize, key: &str) {
    if let Ok(value) = std::env::var(key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(key, value, "ignoring invalid integer env override"),
        }
    }
}

fn override_f64(target: &mut f64, key: &str) {
    if let Ok(value) = std::env::var(key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(key, value, "ignoring invalid float env override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_is_valid() {
        let config = ScanwireConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_minimal_toml() {
        let config = ScanwireConfig::parse("[general]\nlog_level = \"debug\"").unwrap();
        assert_eq!(config.general.log_level, "debug");
        // 나머지 섹션은 기본값
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.limits.tool_activity, 10);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
            [general]
            log_level = "warn"
            log_format = "pretty"

            [server]
            listen_addr = "0.0.0.0"
            port = 9000
            send_queue_capacity = 64

            [heartbeat]
            interval_secs = 5
            timeout_secs = 15
            push_interval_secs = 20

            [engine]
            tick_min_ms = 100
            tick_max_ms = 200
            max_progress_step = 10
            finding_probability = 0.5
            finding_threshold_percent = 20
            event_queue_capacity = 128

            [limits]
            tool_activity = 5
            insights = 10
            chains = 5
            recent_findings = 15

            [metrics]
            enabled = true
            port = 9091
        "#;
        let config = ScanwireConfig::parse(toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.heartbeat.interval_secs, 5);
        assert_eq!(config.engine.finding_probability, 0.5);
        assert_eq!(config.limits.recent_findings, 15);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn parse_invalid_toml_fails() {
        let result = ScanwireConfig::parse("not valid toml [[[");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_bad_log_level() {
        let mut config = ScanwireConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn validate_rejects_bad_log_format() {
        let mut config = ScanwireConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_tick_range() {
        let mut config = ScanwireConfig::default();
        config.engine.tick_min_ms = 5000;
        config.engine.tick_max_ms = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_probability_out_of_range() {
        let mut config = ScanwireConfig::default();
        config.engine.finding_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_heartbeat_timeout() {
        let mut config = ScanwireConfig::default();
        config.heartbeat.interval_secs = 30;
        config.heartbeat.timeout_secs = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut config = ScanwireConfig::default();
        config.limits.insights = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn env_override_applies() {
        // 환경변수는 전역 상태이므로 serial로 실행
        unsafe {
            std::env::set_var("SCANWIRE_SERVER_PORT", "9999");
            std::env::set_var("SCANWIRE_METRICS_ENABLED", "true");
        }
        let mut config = ScanwireConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("SCANWIRE_SERVER_PORT");
            std::env::remove_var("SCANWIRE_METRICS_ENABLED");
        }
        assert_eq!(config.server.port, 9999);
        assert!(config.metrics.enabled);
    }

    #[test]
    #[serial]
    fn env_override_ignores_invalid_values() {
        unsafe {
            std::env::set_var("SCANWIRE_SERVER_PORT", "not-a-port");
        }
        let mut config = ScanwireConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("SCANWIRE_SERVER_PORT");
        }
        assert_eq!(config.server.port, 8080);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = ScanwireConfig::from_file("/nonexistent/scanwire.toml").await;
        match result {
            Err(ScanwireError::Config(ConfigError::FileNotFound { path })) => {
                assert!(path.contains("nonexistent"));
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn from_file_loads_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanwire.toml");
        tokio::fs::write(&path, "[server]\nport = 8181")
            .await
            .unwrap();
        let config = ScanwireConfig::from_file(&path).await.unwrap();
        assert_eq!(config.server.port, 8181);
    }
}
