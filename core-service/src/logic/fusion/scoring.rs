//! Fusion & Scoring
//!
//! Weighted vote over responding sources, blended with raw detection breadth:
//!
//! value = round(0.7 x weighted_average + 0.3 x detection_ratio x 100)
//!
//! An isolated high-weight "malicious" vote cannot reach critical on its own,
//! and neither can a wide detection among low-weight sources.

use super::rules::{
    verdict_score, DETECTION_RATIO_SHARE, MAX_SCORE, MIN_SCORE, WEIGHTED_AVERAGE_SHARE,
};
use super::types::{VendorVerdict, Verdict};
use super::weights::WeightTable;
use crate::error::{FusionError, FusionResult};

/// Intermediate fusion output, consumed by confidence + assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutcome {
    /// Final clamped value, 0 - 100
    pub value: u8,
    pub weighted_average: f64,
    /// malicious / responded
    pub detection_ratio: f64,
    pub blended_score: f64,
    pub malicious_count: usize,
    pub responded_count: usize,
}

/// Responding subset R. Errors and timeouts never contribute.
pub fn responded(verdicts: &[VendorVerdict]) -> impl Iterator<Item = &VendorVerdict> {
    verdicts.iter().filter(|v| v.responded())
}

/// Credibility-weighted mean of verdict scores over R.
///
/// Returns `None` when R is empty.
pub fn weighted_average(verdicts: &[VendorVerdict], weights: &WeightTable) -> Option<f64> {
    let mut weighted_sum = 0.0f64;
    let mut weight_total = 0.0f64;

    for verdict in responded(verdicts) {
        let Some(score) = verdict_score(verdict.verdict()) else {
            continue;
        };
        let weight = weights.weight_for(verdict.source_name());
        weighted_sum += score * weight;
        weight_total += weight;
    }

    if weight_total > 0.0 {
        Some(weighted_sum / weight_total)
    } else {
        None
    }
}

/// Combine normalized verdicts into one value.
pub fn fuse(verdicts: &[VendorVerdict], weights: &WeightTable) -> FusionResult<FusionOutcome> {
    let responded_count = responded(verdicts).count();

    let weighted_average = match weighted_average(verdicts, weights) {
        Some(avg) if responded_count > 0 => avg,
        _ => {
            return Err(FusionError::InsufficientData {
                queried: verdicts.len(),
            })
        }
    };

    let malicious_count = responded(verdicts)
        .filter(|v| v.verdict() == Verdict::Malicious)
        .count();

    let detection_ratio = malicious_count as f64 / responded_count as f64;

    let blended_score = WEIGHTED_AVERAGE_SHARE * weighted_average
        + DETECTION_RATIO_SHARE * (detection_ratio * 100.0);

    let value = blended_score.round().clamp(MIN_SCORE, MAX_SCORE) as u8;

    log::debug!(
        "Fusion: weighted_avg={:.2}, detection={}/{}, blended={:.2}, value={}",
        weighted_average,
        malicious_count,
        responded_count,
        blended_score,
        value
    );

    Ok(FusionOutcome {
        value,
        weighted_average,
        detection_ratio,
        blended_score,
        malicious_count,
        responded_count,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> WeightTable {
        WeightTable::new(1.0).unwrap()
    }

    #[test]
    fn test_two_of_three_malicious() {
        let verdicts = vec![
            VendorVerdict::answered("a", Verdict::Malicious),
            VendorVerdict::answered("b", Verdict::Malicious),
            VendorVerdict::answered("c", Verdict::Harmless),
        ];

        let outcome = fuse(&verdicts, &flat()).unwrap();
        assert!((outcome.weighted_average - 66.666).abs() < 0.01);
        assert!((outcome.detection_ratio - 0.6667).abs() < 0.001);
        assert_eq!(outcome.value, 67);
    }

    #[test]
    fn test_single_harmless() {
        let verdicts = vec![
            VendorVerdict::answered("a", Verdict::Harmless),
            VendorVerdict::no_response("b"),
            VendorVerdict::no_response("c"),
        ];

        let outcome = fuse(&verdicts, &flat()).unwrap();
        assert_eq!(outcome.value, 0);
        assert_eq!(outcome.responded_count, 1);
    }

    #[test]
    fn test_no_responders_is_insufficient_data() {
        let verdicts = vec![VendorVerdict::no_response("a"), VendorVerdict::no_response("b")];
        assert_eq!(
            fuse(&verdicts, &flat()).unwrap_err(),
            FusionError::InsufficientData { queried: 2 }
        );
        assert_eq!(
            fuse(&[], &flat()).unwrap_err(),
            FusionError::InsufficientData { queried: 0 }
        );
    }

    #[test]
    fn test_undetected_counts_as_unrated() {
        let undetected = vec![VendorVerdict::answered("a", Verdict::Undetected)];
        let unrated = vec![VendorVerdict::answered("a", Verdict::Unrated)];
        assert_eq!(
            fuse(&undetected, &flat()).unwrap().value,
            fuse(&unrated, &flat()).unwrap().value
        );
        // 0.7 x 40 = 28
        assert_eq!(fuse(&undetected, &flat()).unwrap().value, 28);
    }

    #[test]
    fn test_isolated_heavy_vote_is_not_critical() {
        let weights = flat().with_weight("trusted", 10.0).unwrap();
        let verdicts = vec![
            VendorVerdict::answered("trusted", Verdict::Malicious),
            VendorVerdict::answered("b", Verdict::Harmless),
            VendorVerdict::answered("c", Verdict::Harmless),
            VendorVerdict::answered("d", Verdict::Harmless),
        ];

        let outcome = fuse(&verdicts, &weights).unwrap();
        // weighted avg = 1000/13 = 76.9, ratio = 0.25 -> 53.8 + 7.5 = 61
        assert_eq!(outcome.value, 61);
        assert!(outcome.value < 85);
    }

    #[test]
    fn test_all_malicious_is_max() {
        let verdicts = vec![
            VendorVerdict::answered("a", Verdict::Malicious),
            VendorVerdict::answered("b", Verdict::Malicious),
        ];
        assert_eq!(fuse(&verdicts, &flat()).unwrap().value, 100);
    }

    #[test]
    fn test_suspicious_without_detections() {
        let verdicts = vec![
            VendorVerdict::answered("a", Verdict::Suspicious),
            VendorVerdict::answered("b", Verdict::Suspicious),
            VendorVerdict::answered("c", Verdict::Harmless),
        ];
        // 0.7 x 43.33 + 0 = 30.33
        let outcome = fuse(&verdicts, &flat()).unwrap();
        assert_eq!(outcome.malicious_count, 0);
        assert_eq!(outcome.value, 30);
    }
}
