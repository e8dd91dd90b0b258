//! Logic Module - Business Logic & Engines
//!
//! ## Pipeline
//! - `indicator/` - Indicator type detection
//! - `external_intel/` - Reputation sources + verdict normalizer
//! - `fusion/` - Weighted fusion, confidence, risk bucket, result assembly
//! - `analysis/` - Fan-out + `FusionEngine`
//! - `history/` - Result hand-off (`HistorySink`)

pub mod analysis;
pub mod external_intel;
pub mod fusion;
pub mod history;
pub mod indicator;
