//! Coarse risk-level estimation for display
//!
//! Global invariants enforced:
//! - Deterministic classification
//! - Monotone in BAC and in prior offenses
//! - Independent of the penalty rule table: the cut points here are not
//!   derived from the PCA bands and must not be unified with them

use serde::{Deserialize, Serialize};

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[serde(alias = "Low", alias = "low")]
    Low,
    #[serde(alias = "Medium", alias = "medium")]
    Medium,
    #[serde(alias = "High", alias = "high")]
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// Title-case label used in narrative reports
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

/// Configurable risk cut points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    pub medium_bac: f64,
    pub high_bac: f64,
    pub medium_priors: i64,
    pub high_priors: i64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        RiskThresholds {
            medium_bac: 0.08,
            high_bac: 0.15,
            medium_priors: 1,
            high_priors: 2,
        }
    }
}

/// Estimate risk level with default thresholds
///
/// HIGH if bac >= 0.15 or priors >= 2, MEDIUM if bac >= 0.08 or priors >= 1,
/// LOW otherwise.
pub fn estimate_risk(bac: f64, prior_offenses: i64) -> RiskLevel {
    estimate_risk_with_thresholds(bac, prior_offenses, &RiskThresholds::default())
}

/// Estimate risk level with custom thresholds
pub fn estimate_risk_with_thresholds(
    bac: f64,
    prior_offenses: i64,
    thresholds: &RiskThresholds,
) -> RiskLevel {
    if bac >= thresholds.high_bac || prior_offenses >= thresholds.high_priors {
        RiskLevel::High
    } else if bac >= thresholds.medium_bac || prior_offenses >= thresholds.medium_priors {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cut_points() {
        assert_eq!(estimate_risk(0.083, 0), RiskLevel::Medium);
        assert_eq!(estimate_risk(0.16, 0), RiskLevel::High);
        assert_eq!(estimate_risk(0.04, 0), RiskLevel::Low);
        assert_eq!(estimate_risk(0.04, 1), RiskLevel::Medium);
        assert_eq!(estimate_risk(0.04, 2), RiskLevel::High);
    }

    #[test]
    fn test_boundaries_inclusive() {
        assert_eq!(estimate_risk(0.08, 0), RiskLevel::Medium);
        assert_eq!(estimate_risk(0.15, 0), RiskLevel::High);
    }

    #[test]
    fn test_low_range_pca_is_still_low_risk() {
        // 0.05 - 0.079 is an offense band but below the medium cut point
        assert_eq!(estimate_risk(0.06, 0), RiskLevel::Low);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = RiskThresholds {
            medium_bac: 0.05,
            high_bac: 0.10,
            medium_priors: 1,
            high_priors: 3,
        };
        assert_eq!(estimate_risk_with_thresholds(0.06, 0, &thresholds), RiskLevel::Medium);
        assert_eq!(estimate_risk_with_thresholds(0.04, 2, &thresholds), RiskLevel::Medium);
        assert_eq!(estimate_risk_with_thresholds(0.12, 0, &thresholds), RiskLevel::High);
    }

    #[test]
    fn test_levels_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }
}
