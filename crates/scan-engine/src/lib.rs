#![doc = include_str!("../README.md")]

pub mod engine;
pub mod error;
pub mod phases;
pub mod simulator;

// --- 주요 타입 re-export ---

// 계약
pub use engine::{BoxFuture, EventSink, ScanEngine, ScanSpec};

// 시뮬레이터
pub use simulator::SimScanEngine;

// 에러
pub use error::EngineError;
