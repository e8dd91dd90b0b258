//! Fusion Rules & Thresholds
//!
//! Constants only - no scoring logic lives here.

use super::types::Verdict;

// ============================================================================
// VERDICT SCORES
// ============================================================================

pub const MALICIOUS_SCORE: f64 = 100.0;
pub const SUSPICIOUS_SCORE: f64 = 65.0;
/// "No detection" is absence of evidence, not evidence of safety.
pub const UNRATED_SCORE: f64 = 40.0;
pub const HARMLESS_SCORE: f64 = 0.0;

/// Numeric contribution of a verdict. `Error` never contributes.
pub fn verdict_score(verdict: Verdict) -> Option<f64> {
    match verdict {
        Verdict::Malicious => Some(MALICIOUS_SCORE),
        Verdict::Suspicious => Some(SUSPICIOUS_SCORE),
        Verdict::Unrated | Verdict::Undetected => Some(UNRATED_SCORE),
        Verdict::Harmless => Some(HARMLESS_SCORE),
        Verdict::Error => None,
    }
}

// ============================================================================
// BLEND WEIGHTS
// ============================================================================

/// Share of the credibility-weighted average in the final value (70%)
pub const WEIGHTED_AVERAGE_SHARE: f64 = 0.7;

/// Share of the raw detection ratio in the final value (30%)
pub const DETECTION_RATIO_SHARE: f64 = 0.3;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

// ============================================================================
// CONFIDENCE
// ============================================================================

/// A source agrees when its verdict score is within this many points
/// of the weighted average (inclusive).
pub const AGREEMENT_BAND: f64 = 25.0;

pub const COVERAGE_SHARE: f64 = 0.5;
pub const AGREEMENT_SHARE: f64 = 0.5;

// ============================================================================
// RISK BUCKETS (inclusive lower bounds)
// ============================================================================

pub const LOW_MIN: u8 = 15;
pub const MEDIUM_MIN: u8 = 35;
pub const HIGH_MIN: u8 = 60;
pub const CRITICAL_MIN: u8 = 85;
