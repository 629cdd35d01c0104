#![doc = include_str!("../README.md")]

pub mod error;
pub mod reducer;

// --- 주요 타입 re-export ---

pub use error::ReducerError;
pub use reducer::SessionReducer;
