//! Result Assembler
//!
//! Merges score, confidence, bucket, categories and tags into one immutable
//! `AnalysisResult`. No I/O, no failure modes beyond those of earlier stages.

use std::collections::BTreeSet;

use super::bucket::bucket;
use super::confidence::{estimate, ConfidenceOutcome};
use super::scoring::{fuse, responded, FusionOutcome};
use super::types::{AnalysisResult, ScoreBreakdown, ThreatScore, VendorVerdict, Verdict};
use super::weights::WeightTable;
use crate::error::FusionResult;
use crate::logic::indicator::Indicator;

// ============================================================================
// TAGS
// ============================================================================

pub const TAG_CONSENSUS: &str = "multi-source-consensus";
pub const TAG_SINGLE_SOURCE: &str = "single-source";
pub const TAG_PARTIAL_COVERAGE: &str = "partial-coverage";
pub const TAG_CONFLICTING: &str = "conflicting-verdicts";
pub const TAG_ISOLATED_DETECTION: &str = "isolated-detection";
pub const TAG_NO_DETECTIONS: &str = "no-detections";

// ============================================================================
// PIPELINE
// ============================================================================

/// Run fusion, confidence, bucketing and assembly over a collected verdict set.
///
/// Deterministic apart from `analysis_id` and `analyzed_at`.
pub fn evaluate(
    indicator: Indicator,
    verdicts: Vec<VendorVerdict>,
    weights: &WeightTable,
) -> FusionResult<AnalysisResult> {
    let fusion = fuse(&verdicts, weights)?;
    let confidence = estimate(&verdicts, fusion.weighted_average);
    Ok(assemble(indicator, verdicts, &fusion, &confidence))
}

/// Build the final record from already computed stage outputs.
pub fn assemble(
    indicator: Indicator,
    verdicts: Vec<VendorVerdict>,
    fusion: &FusionOutcome,
    confidence: &ConfidenceOutcome,
) -> AnalysisResult {
    let risk_level = bucket(fusion.value);
    let detection_ratio = format!("{}/{}", fusion.malicious_count, fusion.responded_count);

    let breakdown = ScoreBreakdown {
        weighted_average: fusion.weighted_average,
        detection_ratio: fusion.detection_ratio,
        blended_score: fusion.blended_score,
        coverage: confidence.coverage,
        agreement: confidence.agreement,
        sources_queried: confidence.sources_queried,
        sources_responded: fusion.responded_count,
    };

    let threat_score = ThreatScore::new(
        fusion.value,
        confidence.confidence,
        risk_level,
        reasoning(fusion, confidence),
        detection_ratio,
        breakdown,
    );

    let categories = collect_categories(&verdicts);
    let tags = derive_tags(&verdicts, fusion, confidence);

    log::debug!(
        "Assembled {}: value={} risk={} confidence={:.2}",
        indicator,
        fusion.value,
        risk_level,
        confidence.confidence
    );

    AnalysisResult::new(indicator, threat_score, verdicts, categories, tags)
}

// ============================================================================
// HELPERS
// ============================================================================

fn reasoning(fusion: &FusionOutcome, confidence: &ConfidenceOutcome) -> String {
    let mut text = format!(
        "{} of {} sources flagged malicious; weighted score {}; confidence {:.2}.",
        fusion.malicious_count, fusion.responded_count, fusion.value, confidence.confidence
    );

    let missing = confidence.sources_queried.saturating_sub(fusion.responded_count);
    if missing > 0 {
        text.push_str(&format!(
            " {} of {} sources did not respond.",
            missing, confidence.sources_queried
        ));
    }

    text
}

/// Union of non-empty raw categories across responding sources.
fn collect_categories(verdicts: &[VendorVerdict]) -> BTreeSet<String> {
    responded(verdicts)
        .filter_map(|v| v.raw_category())
        .map(str::to_string)
        .collect()
}

fn derive_tags(
    verdicts: &[VendorVerdict],
    fusion: &FusionOutcome,
    confidence: &ConfidenceOutcome,
) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    let responded_count = fusion.responded_count;

    let has = |wanted: Verdict| responded(verdicts).any(|v| v.verdict() == wanted);

    if responded_count >= 2 && confidence.agreeing_count == responded_count {
        tags.insert(TAG_CONSENSUS.to_string());
    }
    if responded_count == 1 {
        tags.insert(TAG_SINGLE_SOURCE.to_string());
    }
    if responded_count < confidence.sources_queried {
        tags.insert(TAG_PARTIAL_COVERAGE.to_string());
    }
    if has(Verdict::Malicious) && has(Verdict::Harmless) {
        tags.insert(TAG_CONFLICTING.to_string());
    }
    if fusion.malicious_count == 1 && responded_count >= 2 {
        tags.insert(TAG_ISOLATED_DETECTION.to_string());
    }
    if !has(Verdict::Malicious) && !has(Verdict::Suspicious) {
        tags.insert(TAG_NO_DETECTIONS.to_string());
    }

    tags
}

// ============================================================================
// TESTS
// ============================================================================
