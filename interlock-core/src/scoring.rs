//! Case severity score (1-100) shown alongside the risk level
//!
//! score = clamp(10, 100, round(bac * 100 + priors * 20))

use serde::{Deserialize, Serialize};

pub const MIN_SCORE: u8 = 10;
pub const MAX_SCORE: u8 = 100;

/// Weights for computing the case score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    /// Points per unit of BAC (0.083 -> 8.3 points)
    pub bac: f64,
    /// Points per prior offense
    pub prior_offense: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            bac: 100.0,
            prior_offense: 20.0,
        }
    }
}

/// Breakdown of score components before rounding and clamping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub bac: f64,
    pub prior_offenses: f64,
}

/// Compute the case score with default weights
pub fn case_score(bac: f64, prior_offenses: i64) -> u8 {
    compute_case_score(bac, prior_offenses, &ScoringWeights::default()).0
}

/// Compute the case score and its breakdown
///
/// Non-finite intermediate values collapse to the minimum score so any
/// input produces a well-formed result.
pub fn compute_case_score(
    bac: f64,
    prior_offenses: i64,
    weights: &ScoringWeights,
) -> (u8, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        bac: bac * weights.bac,
        prior_offenses: prior_offenses as f64 * weights.prior_offense,
    };
    let score = clamp_score(breakdown.bac + breakdown.prior_offenses);
    (score, breakdown)
}

/// Round a raw score into `MIN_SCORE..=MAX_SCORE`, NaN collapsing to the minimum
pub fn clamp_score(raw: f64) -> u8 {
    let rounded = raw.round();
    if rounded.is_nan() {
        MIN_SCORE
    } else {
        rounded.clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u8
    }
}
