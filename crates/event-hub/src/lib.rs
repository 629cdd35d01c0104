#![doc = include_str!("../README.md")]

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod hub;
pub mod registry;

// --- 주요 타입 re-export ---

// 허브
pub use hub::{EventHub, EventHubBuilder};

// 레지스트리
pub use registry::SessionRegistry;

// 연결
pub use connection::{ConnectionManager, ObserverConnection, SendOutcome};

// 하트비트
pub use heartbeat::{HeartbeatResult, run_heartbeat, spawn_connection_monitor};

// 에러
pub use error::HubError;
