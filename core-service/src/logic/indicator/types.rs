//! Indicator Types
//!
//! Data structures only - classification logic lives in `classifier.rs`.

use serde::{Deserialize, Serialize};

// ============================================================================
// INDICATOR TYPE
// ============================================================================

/// Loại indicator được hỗ trợ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorType {
    Ip,
    Domain,
    Url,
    Hash,
}

impl IndicatorType {
    pub const ALL: [IndicatorType; 4] = [
        IndicatorType::Ip,
        IndicatorType::Domain,
        IndicatorType::Url,
        IndicatorType::Hash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::Ip => "ip",
            IndicatorType::Domain => "domain",
            IndicatorType::Url => "url",
            IndicatorType::Hash => "hash",
        }
    }
}

impl std::fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IndicatorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ip" => Ok(IndicatorType::Ip),
            "domain" => Ok(IndicatorType::Domain),
            "url" => Ok(IndicatorType::Url),
            "hash" => Ok(IndicatorType::Hash),
            other => Err(format!("unknown indicator type: {}", other)),
        }
    }
}

// ============================================================================
// INDICATOR
// ============================================================================

/// The literal observable plus its classified type.
///
/// Immutable once built: construct it through [`super::classify_indicator`]
/// or [`Indicator::with_type`] when the caller supplies an override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    value: String,
    #[serde(rename = "type")]
    indicator_type: IndicatorType,
}

impl Indicator {
    /// Build an indicator with an externally supplied type (no classification).
    pub fn with_type(value: &str, indicator_type: IndicatorType) -> Self {
        Self {
            value: value.trim().to_string(),
            indicator_type,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn indicator_type(&self) -> IndicatorType {
        self.indicator_type
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.value, self.indicator_type)
    }
}
