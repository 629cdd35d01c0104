#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod snapshot;
pub mod types;
pub mod wire;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, EventError, ScanwireError};

// 설정
pub use config::ScanwireConfig;

// 이벤트
pub use event::{EVENT_KINDS, ScanEvent};

// 스냅샷
pub use snapshot::{LogLimits, RecordedFinding, SessionSnapshot};

// 도메인 타입
pub use types::{
    AttackChain, Finding, Insight, ScanMode, ScanOptions, ScanSummary, Session, SessionStatus,
    Severity, ToolActivityEntry, ToolStatus,
};

// 와이어 프로토콜
pub use wire::{ClientMessage, ObserverMessage, ServerNotice};
