//! Analysis Module - Orchestration
//!
//! - `fanout`: concurrent, deadline-bounded source queries
//! - `engine`: `FusionEngine`, the public entry point

pub mod engine;
pub mod fanout;

pub use engine::{hash_file, FusionEngine, FusionEngineBuilder};
pub use fanout::FanOut;
