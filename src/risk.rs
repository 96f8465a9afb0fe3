/// Bloom risk classification.
///
/// Converts a chlorophyll-a concentration into the three derived risk fields
/// carried on every observation: a continuous bloom probability, a discrete
/// risk tier, and an independent binary bloom label. All three are pure
/// deterministic functions of the concentration — the enrichment pipeline and
/// the snapshot verifier both rely on being able to recompute them.

use crate::model::RiskLevel;

// ---------------------------------------------------------------------------
// Classification constants
// ---------------------------------------------------------------------------

/// Linear probability ramp: chl 5 maps to ~0, chl 20 maps to ~1.
const PROB_RAMP_ORIGIN: f64 = 5.0;
const PROB_RAMP_SPAN: f64 = 15.0;

/// Clamp bounds keep the score away from degenerate 0/1 probabilities.
const PROB_FLOOR: f64 = 0.05;
const PROB_CEIL: f64 = 0.95;

/// Chlorophyll concentration above which the binary bloom label fires.
/// Deliberately an independent threshold rather than a function of the
/// continuous score; the two disagree in the 10-14 range and that mismatch
/// is a retained property of the upstream dataset.
const BLOOM_LABEL_THRESHOLD: f64 = 10.0;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// The derived risk fields for one chlorophyll concentration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub bloom_probability: f64,
    pub risk_level: RiskLevel,
    pub bloom_label: u8,
}

/// Classifies a chlorophyll-a concentration.
///
/// The caller is responsible for having validated the concentration
/// (non-null, non-negative); there are no error conditions here.
pub fn classify(chlorophyll_a: f64) -> RiskAssessment {
    let bloom_probability = bloom_probability(chlorophyll_a);
    RiskAssessment {
        bloom_probability,
        risk_level: risk_level_for(bloom_probability),
        bloom_label: if chlorophyll_a > BLOOM_LABEL_THRESHOLD { 1 } else { 0 },
    }
}

/// Linear bloom probability, clamped to [0.05, 0.95].
pub fn bloom_probability(chlorophyll_a: f64) -> f64 {
    let raw = (chlorophyll_a - PROB_RAMP_ORIGIN) / PROB_RAMP_SPAN;
    raw.clamp(PROB_FLOOR, PROB_CEIL)
}

/// Buckets a bloom probability into a risk tier.
///
/// Intervals are closed on the right: (0, 0.3] low, (0.3, 0.6] medium,
/// (0.6, 0.8] high, (0.8, 1.0] critical. A probability of exactly 0.3 is
/// therefore `Low`; the boundary convention is pinned by tests because the
/// reference dataset was produced with the same closed-right binning.
pub fn risk_level_for(probability: f64) -> RiskLevel {
    if probability <= 0.3 {
        RiskLevel::Low
    } else if probability <= 0.6 {
        RiskLevel::Medium
    } else if probability <= 0.8 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- Probability ramp ---------------------------------------------------

    #[test]
    fn test_probability_floor_below_ramp() {
        // Everything at or below chl 5 sits on the 0.05 floor.
        for chl in [0.0, 1.0, 3.0, 5.0] {
            assert_eq!(bloom_probability(chl), 0.05, "chl {} should clamp to floor", chl);
        }
    }

    #[test]
    fn test_probability_ceiling_above_ramp() {
        for chl in [20.0, 22.0, 50.0, 500.0] {
            assert_eq!(bloom_probability(chl), 0.95, "chl {} should clamp to ceiling", chl);
        }
    }

    #[test]
    fn test_probability_linear_in_between() {
        // (12.5 - 5) / 15 = 0.5 exactly.
        assert!((bloom_probability(12.5) - 0.5).abs() < 1e-12);
        // (8 - 5) / 15 = 0.2
        assert!((bloom_probability(8.0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_probability_monotonic_non_decreasing() {
        let mut prev = f64::MIN;
        let mut chl = 0.0;
        while chl <= 30.0 {
            let p = bloom_probability(chl);
            assert!(p >= prev, "probability must not decrease (chl {})", chl);
            prev = p;
            chl += 0.25;
        }
    }

    // --- Risk tiers ---------------------------------------------------------

    #[test]
    fn test_risk_tier_representative_values() {
        assert_eq!(risk_level_for(0.25), RiskLevel::Low);
        assert_eq!(risk_level_for(0.45), RiskLevel::Medium);
        assert_eq!(risk_level_for(0.75), RiskLevel::High);
        assert_eq!(risk_level_for(0.95), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_tier_boundaries_are_closed_right() {
        // Exactly 0.3 belongs to the lower-named bucket (the interval that
        // ends at 0.3); just above it tips into the next tier.
        assert_eq!(risk_level_for(0.3), RiskLevel::Low);
        assert_eq!(risk_level_for(0.3 + 1e-9), RiskLevel::Medium);
        assert_eq!(risk_level_for(0.6), RiskLevel::Medium);
        assert_eq!(risk_level_for(0.6 + 1e-9), RiskLevel::High);
        assert_eq!(risk_level_for(0.8), RiskLevel::High);
        assert_eq!(risk_level_for(0.8 + 1e-9), RiskLevel::Critical);
    }

    // --- Bloom label --------------------------------------------------------

    #[test]
    fn test_bloom_label_independent_threshold() {
        assert_eq!(classify(10.0).bloom_label, 0, "label threshold is strictly greater than");
        assert_eq!(classify(10.1).bloom_label, 1);
        assert_eq!(classify(3.0).bloom_label, 0);
        assert_eq!(classify(22.0).bloom_label, 1);
    }

    #[test]
    fn test_label_and_probability_intentionally_disagree_in_midrange() {
        // chl 11: label fires (> 10) but probability is only 0.4 (medium).
        // This mismatch is carried over from the source dataset on purpose.
        let assessment = classify(11.0);
        assert_eq!(assessment.bloom_label, 1);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    // --- Full classification ------------------------------------------------

    #[test]
    fn test_classify_is_consistent_with_component_functions() {
        for chl in [0.0, 4.9, 5.0, 7.3, 12.5, 19.99, 20.0, 31.0] {
            let a = classify(chl);
            assert_eq!(a.bloom_probability, bloom_probability(chl));
            assert_eq!(a.risk_level, risk_level_for(a.bloom_probability));
        }
    }
}
