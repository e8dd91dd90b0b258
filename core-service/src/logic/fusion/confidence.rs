//! Confidence Estimator
//!
//! confidence = 0.5 x coverage + 0.5 x agreement
//!
//! coverage  = |R| / sources queried
//! agreement = share of R whose verdict score lies within 25 points
//!             of the weighted average

use super::rules::{verdict_score, AGREEMENT_BAND, AGREEMENT_SHARE, COVERAGE_SHARE};
use super::scoring::responded;
use super::types::VendorVerdict;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceOutcome {
    pub confidence: f64,
    pub coverage: f64,
    pub agreement: f64,
    pub agreeing_count: usize,
    pub sources_queried: usize,
}

/// `verdicts` is the full fan-out list, non-responders included.
pub fn estimate(verdicts: &[VendorVerdict], weighted_average: f64) -> ConfidenceOutcome {
    let sources_queried = verdicts.len();
    let responded_scores: Vec<f64> = responded(verdicts)
        .filter_map(|v| verdict_score(v.verdict()))
        .collect();

    if sources_queried == 0 || responded_scores.is_empty() {
        return ConfidenceOutcome {
            confidence: 0.0,
            coverage: 0.0,
            agreement: 0.0,
            agreeing_count: 0,
            sources_queried,
        };
    }

    let coverage = responded_scores.len() as f64 / sources_queried as f64;

    let agreeing_count = responded_scores
        .iter()
        .filter(|score| (*score - weighted_average).abs() <= AGREEMENT_BAND)
        .count();
    let agreement = agreeing_count as f64 / responded_scores.len() as f64;

    let confidence = (COVERAGE_SHARE * coverage + AGREEMENT_SHARE * agreement).clamp(0.0, 1.0);

    ConfidenceOutcome {
        confidence,
        coverage,
        agreement,
        agreeing_count,
        sources_queried,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::fusion::types::Verdict;

    #[test]
    fn test_full_agreement_full_coverage() {
        let verdicts = vec![
            VendorVerdict::answered("a", Verdict::Malicious),
            VendorVerdict::answered("b", Verdict::Malicious),
        ];
        let outcome = estimate(&verdicts, 100.0);
        assert_eq!(outcome.coverage, 1.0);
        assert_eq!(outcome.agreement, 1.0);
        assert_eq!(outcome.confidence, 1.0);
    }

    #[test]
    fn test_single_source_of_five() {
        let mut verdicts = vec![VendorVerdict::answered("a", Verdict::Harmless)];
        for name in ["b", "c", "d", "e"] {
            verdicts.push(VendorVerdict::no_response(name));
        }
        let outcome = estimate(&verdicts, 0.0);
        assert!((outcome.coverage - 0.2).abs() < 1e-9);
        assert_eq!(outcome.agreement, 1.0);
        assert!((outcome.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_split_vote_has_no_agreement() {
        // 100, 100, 0 around 66.7: every source is more than 25 points away
        let verdicts = vec![
            VendorVerdict::answered("a", Verdict::Malicious),
            VendorVerdict::answered("b", Verdict::Malicious),
            VendorVerdict::answered("c", Verdict::Harmless),
        ];
        let outcome = estimate(&verdicts, 200.0 / 3.0);
        assert_eq!(outcome.agreement, 0.0);
        assert!((outcome.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_band_is_inclusive() {
        // suspicious (65) vs unrated (40): exactly 25 apart
        let verdicts = vec![VendorVerdict::answered("a", Verdict::Suspicious)];
        assert_eq!(estimate(&verdicts, 40.0).agreeing_count, 1);
        assert_eq!(estimate(&verdicts, 39.9).agreeing_count, 0);
    }

    #[test]
    fn test_nothing_queried() {
        assert_eq!(estimate(&[], 0.0).confidence, 0.0);
    }

    #[test]
    fn test_more_spread_never_raises_confidence() {
        let tight = vec![
            VendorVerdict::answered("a", Verdict::Suspicious),
            VendorVerdict::answered("b", Verdict::Suspicious),
            VendorVerdict::answered("c", Verdict::Suspicious),
        ];
        let loose = vec![
            VendorVerdict::answered("a", Verdict::Malicious),
            VendorVerdict::answered("b", Verdict::Suspicious),
            VendorVerdict::answered("c", Verdict::Unrated),
        ];
        let wide = vec![
            VendorVerdict::answered("a", Verdict::Malicious),
            VendorVerdict::answered("b", Verdict::Suspicious),
            VendorVerdict::answered("c", Verdict::Harmless),
        ];

        let tight_c = estimate(&tight, 65.0).confidence;
        let loose_c = estimate(&loose, 205.0 / 3.0).confidence;
        let wide_c = estimate(&wide, 55.0).confidence;

        assert!(tight_c >= loose_c);
        assert!(loose_c >= wide_c);
    }
}
