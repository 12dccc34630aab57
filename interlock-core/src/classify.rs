//! Range classifiers for BAC readings and prior-offense counts
//!
//! Global invariants enforced:
//! - BAC bands partition [0.02, inf) with inclusive lower bounds
//! - Classification is referentially transparent
//! - Invalid readings are rejected, never clamped

use crate::error::{AssessError, AssessResult};
use serde::{Deserialize, Serialize};

/// Readings above this are physiologically implausible and rejected
pub const BAC_CEILING: f64 = 1.0;

/// Prescribed concentration of alcohol band
///
/// Variant order is severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BacRange {
    #[serde(rename = "SPECIAL_RANGE")]
    Special,
    #[serde(rename = "LOW_RANGE")]
    Low,
    #[serde(rename = "MID_RANGE")]
    Mid,
    #[serde(rename = "HIGH_RANGE")]
    High,
}

impl BacRange {
    pub const ALL: [BacRange; 4] = [
        BacRange::Special,
        BacRange::Low,
        BacRange::Mid,
        BacRange::High,
    ];

    /// Inclusive lower bound
    pub fn lower_bound(&self) -> f64 {
        match self {
            BacRange::Special => 0.02,
            BacRange::Low => 0.05,
            BacRange::Mid => 0.08,
            BacRange::High => 0.15,
        }
    }

    /// Exclusive upper bound (`None` for the top band)
    pub fn upper_bound(&self) -> Option<f64> {
        match self {
            BacRange::Special => Some(BacRange::Low.lower_bound()),
            BacRange::Low => Some(BacRange::Mid.lower_bound()),
            BacRange::Mid => Some(BacRange::High.lower_bound()),
            BacRange::High => None,
        }
    }

    pub fn contains(&self, bac: f64) -> bool {
        bac >= self.lower_bound() && self.upper_bound().map_or(true, |max| bac < max)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BacRange::Special => "SPECIAL_RANGE",
            BacRange::Low => "LOW_RANGE",
            BacRange::Mid => "MID_RANGE",
            BacRange::High => "HIGH_RANGE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BacRange::Special => "Special Range (Learner/P1/P2)",
            BacRange::Low => "Low Range PCA",
            BacRange::Mid => "Mid Range PCA",
            BacRange::High => "High Range PCA",
        }
    }
}

/// Offender classification by count of prior qualifying convictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffenseCategory {
    First,
    Second,
    ThirdPlus,
}

impl OffenseCategory {
    pub const ALL: [OffenseCategory; 3] = [
        OffenseCategory::First,
        OffenseCategory::Second,
        OffenseCategory::ThirdPlus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OffenseCategory::First => "first",
            OffenseCategory::Second => "second",
            OffenseCategory::ThirdPlus => "third_plus",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OffenseCategory::First => "First offense",
            OffenseCategory::Second => "Second offense",
            OffenseCategory::ThirdPlus => "Third or subsequent offense",
        }
    }
}

/// Classify a BAC reading into its PCA band
///
/// Scans from the highest band downward and returns the first band whose
/// minimum the reading reaches. Returns `None` for readings below the
/// special-range minimum and for readings that fail [`validate_bac`].
pub fn classify_bac(bac: f64) -> Option<BacRange> {
    if validate_bac(bac).is_err() {
        return None;
    }
    BacRange::ALL
        .iter()
        .rev()
        .find(|range| bac >= range.lower_bound())
        .copied()
}

/// Reject readings that cannot be a measurement
pub fn validate_bac(bac: f64) -> AssessResult<f64> {
    if !bac.is_finite() {
        return Err(AssessError::UnclassifiableBac {
            bac,
            reason: "reading is not a finite number",
        });
    }
    if bac < 0.0 {
        return Err(AssessError::UnclassifiableBac {
            bac,
            reason: "reading is negative",
        });
    }
    if bac > BAC_CEILING {
        return Err(AssessError::UnclassifiableBac {
            bac,
            reason: "reading exceeds the plausible ceiling of 1.0",
        });
    }
    Ok(bac)
}

/// Validate and classify, failing when no band applies
pub fn require_bac_range(bac: f64) -> AssessResult<BacRange> {
    validate_bac(bac)?;
    classify_bac(bac).ok_or(AssessError::UnclassifiableBac {
        bac,
        reason: "reading is below the special range minimum of 0.02",
    })
}

/// Classify a prior-offense count
///
/// Negative counts are rejected rather than clamped.
pub fn classify_offense_count(count: i64) -> AssessResult<OffenseCategory> {
    match count {
        c if c < 0 => Err(AssessError::NegativePriorOffenses(c)),
        0 => Ok(OffenseCategory::First),
        1 => Ok(OffenseCategory::Second),
        _ => Ok(OffenseCategory::ThirdPlus),
    }
}
