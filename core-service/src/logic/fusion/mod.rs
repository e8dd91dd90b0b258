//! Fusion Module
//!
//! Gộp verdict từ nhiều nguồn thành một điểm rủi ro duy nhất.
//! Deterministic, synchronous, no I/O, no locks.
//!
//! ## Structure
//! - `types`: Verdict, VendorVerdict, ThreatScore, AnalysisResult
//! - `rules`: verdict scores, blend shares, bucket bounds
//! - `weights`: credibility weight table
//! - `scoring`: weighted vote + detection ratio blend
//! - `confidence`: coverage / agreement estimator
//! - `bucket`: value -> risk level
//! - `assembler`: final immutable record

pub mod types;
pub mod rules;
pub mod weights;
pub mod scoring;
pub mod confidence;
pub mod bucket;
pub mod assembler;

pub use types::{
    AnalysisResult, RiskLevel, ScoreBreakdown, ThreatScore, VendorVerdict, Verdict,
};
pub use weights::{WeightError, WeightTable, DEFAULT_WEIGHT};
pub use scoring::{fuse, FusionOutcome};
pub use confidence::{estimate, ConfidenceOutcome};
pub use bucket::bucket;
pub use assembler::{assemble, evaluate};
