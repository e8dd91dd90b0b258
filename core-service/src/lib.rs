//! ThreatLens Core - Multi-source indicator reputation fusion
//!
//! Classify an indicator (ip / domain / url / hash), query every configured
//! reputation source concurrently, normalize each answer to a common verdict
//! and fuse them into one 0-100 score with a confidence and risk level.

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{EngineError, FusionError, FusionResult, HistoryError, SourceError};
pub use logic::analysis::{FusionEngine, FusionEngineBuilder};
pub use logic::external_intel::{RawPayload, RawResponse, ReputationSource};
pub use logic::fusion::{
    AnalysisResult, RiskLevel, ScoreBreakdown, ThreatScore, VendorVerdict, Verdict, WeightTable,
};
pub use logic::history::{HistoryQuery, HistorySink, InMemoryHistory};
pub use logic::indicator::{classify, classify_indicator, Indicator, IndicatorType};
