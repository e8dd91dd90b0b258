//! Error handling
//!
//! The engine surfaces exactly two failure kinds to its caller. Everything a
//! single vendor can do wrong is absorbed into a `VendorVerdict` instead.

use thiserror::Error;

use crate::logic::indicator::IndicatorType;

pub type FusionResult<T> = Result<T, FusionError>;

/// Failures surfaced by `classify` / `analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FusionError {
    /// Input cannot be typed. Caller must fix the input.
    #[error("unclassifiable indicator: {indicator:?}")]
    UnclassifiableIndicator { indicator: String },

    /// Every queried source failed or timed out.
    #[error("insufficient data: none of {queried} queried sources responded")]
    InsufficientData { queried: usize },
}

impl FusionError {
    pub fn unclassifiable(indicator: &str) -> Self {
        FusionError::UnclassifiableIndicator {
            indicator: indicator.to_string(),
        }
    }

    /// InsufficientData is worth retrying after a delay, bad input is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FusionError::InsufficientData { .. })
    }
}

/// Per-vendor adapter errors. Never propagated past the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source not configured")]
    NotConfigured,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    /// The vendor answered but has no record of the indicator.
    #[error("indicator not found")]
    NotFound,

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("indicator type {0} not supported by this source")]
    Unsupported(IndicatorType),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// Engine operations that go beyond a single indicator string.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("too many indicators: {count} (max {max})")]
    TooManyIndicators { count: usize, max: usize },
}

/// Failures of the history collaborator. Logged by the engine, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history storage unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate analysis id: {0}")]
    Duplicate(String),
}
