//! Fusion Types
//!
//! Core types for verdict fusion. No scoring logic - data structures only.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::indicator::Indicator;

// ============================================================================
// VERDICT
// ============================================================================

/// The common verdict vocabulary every source is reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Malicious,
    Suspicious,
    Harmless,
    Undetected,
    Unrated,
    /// Timeout, transport failure or unparseable payload
    Error,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Malicious => "malicious",
            Verdict::Suspicious => "suspicious",
            Verdict::Harmless => "harmless",
            Verdict::Undetected => "undetected",
            Verdict::Unrated => "unrated",
            Verdict::Error => "error",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// VENDOR VERDICT (normalized)
// ============================================================================

/// One normalized answer per queried source.
///
/// `verdict == Error` exactly when `responded == false`; the constructors
/// keep the two in lockstep and deserialization rejects anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVendorVerdict")]
pub struct VendorVerdict {
    source_name: String,
    verdict: Verdict,
    raw_category: Option<String>,
    engine_metadata: BTreeMap<String, serde_json::Value>,
    responded: bool,
}

impl VendorVerdict {
    /// A source that answered in time with a usable verdict.
    pub fn answered(source_name: &str, verdict: Verdict) -> Self {
        if verdict == Verdict::Error {
            return Self::no_response(source_name);
        }

        Self {
            source_name: source_name.to_string(),
            verdict,
            raw_category: None,
            engine_metadata: BTreeMap::new(),
            responded: true,
        }
    }

    /// Timeout, transport error or parse failure.
    pub fn no_response(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            verdict: Verdict::Error,
            raw_category: None,
            engine_metadata: BTreeMap::new(),
            responded: false,
        }
    }

    /// Attach a display-only category. Blank categories are dropped.
    pub fn with_category(mut self, category: Option<&str>) -> Self {
        if !self.responded {
            return self;
        }
        self.raw_category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self
    }

    /// Attach opaque metadata. Ignored for sources that never answered.
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        if self.responded {
            self.engine_metadata.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn raw_category(&self) -> Option<&str> {
        self.raw_category.as_deref()
    }

    pub fn engine_metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.engine_metadata
    }

    pub fn responded(&self) -> bool {
        self.responded
    }
}

/// Wire shape of `VendorVerdict`, checked before it becomes one.
#[derive(Deserialize)]
struct RawVendorVerdict {
    source_name: String,
    verdict: Verdict,
    #[serde(default)]
    raw_category: Option<String>,
    #[serde(default)]
    engine_metadata: BTreeMap<String, serde_json::Value>,
    responded: bool,
}

impl TryFrom<RawVendorVerdict> for VendorVerdict {
    type Error = String;

    fn try_from(raw: RawVendorVerdict) -> Result<Self, Self::Error> {
        if (raw.verdict == Verdict::Error) == raw.responded {
            return Err(format!(
                "source {:?}: verdict {} contradicts responded = {}",
                raw.source_name, raw.verdict, raw.responded
            ));
        }
        if !raw.responded && (raw.raw_category.is_some() || !raw.engine_metadata.is_empty()) {
            return Err(format!(
                "source {:?} did not respond but carries category or metadata",
                raw.source_name
            ));
        }

        Ok(Self {
            source_name: raw.source_name,
            verdict: raw.verdict,
            raw_category: raw.raw_category,
            engine_metadata: raw.engine_metadata,
            responded: raw.responded,
        })
    }
}

// ============================================================================
// RISK LEVEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "#10b981",     // Green
            RiskLevel::Low => "#84cc16",      // Lime
            RiskLevel::Medium => "#f59e0b",   // Yellow
            RiskLevel::High => "#f97316",     // Orange
            RiskLevel::Critical => "#ef4444", // Red
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(RiskLevel::Safe),
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

// ============================================================================
// SCORE BREAKDOWN
// ============================================================================

/// How the final value and confidence were derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub weighted_average: f64,
    /// malicious / responded, as a fraction
    pub detection_ratio: f64,
    /// 0.7 x weighted_average + 0.3 x detection_ratio x 100, before rounding
    pub blended_score: f64,
    pub coverage: f64,
    pub agreement: f64,
    pub sources_queried: usize,
    pub sources_responded: usize,
}

// ============================================================================
// THREAT SCORE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatScore {
    value: u8,
    confidence: f64,
    risk_level: RiskLevel,
    reasoning: String,
    detection_ratio: String,
    breakdown: ScoreBreakdown,
}

impl ThreatScore {
    pub(crate) fn new(
        value: u8,
        confidence: f64,
        risk_level: RiskLevel,
        reasoning: String,
        detection_ratio: String,
        breakdown: ScoreBreakdown,
    ) -> Self {
        Self {
            value,
            confidence,
            risk_level,
            reasoning,
            detection_ratio,
            breakdown,
        }
    }

    /// 0 - 100
    pub fn value(&self) -> u8 {
        self.value
    }

    /// 0.0 - 1.0
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// "m/n": malicious count over responding sources
    pub fn detection_ratio(&self) -> &str {
        &self.detection_ratio
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }
}

// ============================================================================
// ANALYSIS RESULT
// ============================================================================

/// Final, immutable record of one analysis request.
///
/// Corrections produce a new result; there are no mutators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    analysis_id: Uuid,
    indicator: Indicator,
    threat_score: ThreatScore,
    vendor_verdicts: Vec<VendorVerdict>,
    categories: BTreeSet<String>,
    tags: BTreeSet<String>,
    analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub(crate) fn new(
        indicator: Indicator,
        threat_score: ThreatScore,
        vendor_verdicts: Vec<VendorVerdict>,
        categories: BTreeSet<String>,
        tags: BTreeSet<String>,
    ) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            indicator,
            threat_score,
            vendor_verdicts,
            categories,
            tags,
            analyzed_at: Utc::now(),
        }
    }

    pub fn analysis_id(&self) -> Uuid {
        self.analysis_id
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    pub fn threat_score(&self) -> &ThreatScore {
        &self.threat_score
    }

    /// Fan-out order
    pub fn vendor_verdicts(&self) -> &[VendorVerdict] {
        &self.vendor_verdicts
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn analyzed_at(&self) -> DateTime<Utc> {
        self.analyzed_at
    }
}
