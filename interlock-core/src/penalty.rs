//! Penalty rule table and base-penalty lookup
//!
//! Global invariants enforced:
//! - The table is static data, never mutated at runtime
//! - Lookups return owned bundles built from the table
//! - min <= max on every range
//! - Penalties are monotone in BAC band and in offense category

use crate::classify::{BacRange, OffenseCategory};
use serde::{Deserialize, Serialize};

/// Closed numeric interval (currency units, months or hours)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub min: u32,
    pub max: u32,
}

impl Range {
    pub const ZERO: Range = Range { min: 0, max: 0 };

    pub const fn new(min: u32, max: u32) -> Self {
        Range { min, max }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }

    /// Zero-width at zero, i.e. "not applicable"
    pub fn is_zero(&self) -> bool {
        self.min == 0 && self.max == 0
    }
}

/// Aggregate set of sanctions attached to a classified case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyBundle {
    pub fine: Range,
    /// Months
    pub license_suspension: Range,
    /// Months; zero-width means no custodial exposure
    pub prison_term: Range,
    #[serde(rename = "interlock")]
    pub interlock_required: bool,
    /// Hours
    pub community_service: Range,
    pub description: String,
}

impl PenaltyBundle {
    /// Every range ordered (non-negativity holds by type)
    pub fn is_well_formed(&self) -> bool {
        self.fine.is_ordered()
            && self.license_suspension.is_ordered()
            && self.prison_term.is_ordered()
            && self.community_service.is_ordered()
    }

    /// True when every dimension of `self` is at most the matching dimension of `other`
    pub fn is_dominated_by(&self, other: &PenaltyBundle) -> bool {
        let le = |a: Range, b: Range| a.min <= b.min && a.max <= b.max;
        le(self.fine, other.fine)
            && le(self.license_suspension, other.license_suspension)
            && le(self.prison_term, other.prison_term)
            && le(self.community_service, other.community_service)
            && (!self.interlock_required || other.interlock_required)
    }
}

/// Static row of the rule table
#[derive(Debug, Clone, Copy)]
pub struct PenaltyRow {
    pub fine: Range,
    pub license_suspension: Range,
    pub prison_term: Range,
    pub interlock_required: bool,
    pub community_service: Range,
    pub description: &'static str,
}

impl PenaltyRow {
    pub fn to_bundle(&self) -> PenaltyBundle {
        PenaltyBundle {
            fine: self.fine,
            license_suspension: self.license_suspension,
            prison_term: self.prison_term,
            interlock_required: self.interlock_required,
            community_service: self.community_service,
            description: self.description.to_string(),
        }
    }
}

const fn row(
    fine: (u32, u32),
    suspension: (u32, u32),
    prison: (u32, u32),
    interlock: bool,
    community: (u32, u32),
    description: &'static str,
) -> PenaltyRow {
    PenaltyRow {
        fine: Range::new(fine.0, fine.1),
        license_suspension: Range::new(suspension.0, suspension.1),
        prison_term: Range::new(prison.0, prison.1),
        interlock_required: interlock,
        community_service: Range::new(community.0, community.1),
        description,
    }
}

/// Versioned mapping (BAC band, offense category) -> penalty row
#[derive(Debug)]
pub struct RuleTable {
    version: &'static str,
    jurisdiction: &'static str,
    /// Indexed `[band][category]` in severity order
    rows: [[PenaltyRow; 3]; 4],
}

/// NSW Road Transport Act 2013 PCA schedule
pub static NSW_RULE_TABLE: RuleTable = RuleTable {
    version: "nsw-rta-2013",
    jurisdiction: "NSW",
    rows: [
        // Special range (0.02 - 0.049)
        [
            row((561, 1122), (3, 6), (0, 0), false, (0, 100), "First offense special range PCA"),
            row((1122, 2244), (6, 12), (0, 6), true, (0, 200), "Second offense special range PCA"),
            row(
                (2244, 4488),
                (12, 24),
                (0, 12),
                true,
                (0, 300),
                "Third or subsequent offense special range PCA",
            ),
        ],
        // Low range (0.05 - 0.079)
        [
            row((1100, 2200), (3, 6), (0, 9), false, (0, 200), "First offense low range PCA"),
            row((2200, 3300), (6, 12), (0, 12), true, (0, 300), "Second offense low range PCA"),
            row(
                (3300, 5500),
                (12, 36),
                (0, 18),
                true,
                (0, 500),
                "Third or subsequent offense low range PCA",
            ),
        ],
        // Mid range (0.08 - 0.149)
        [
            row((2200, 3300), (6, 12), (0, 12), true, (0, 300), "First offense mid range PCA"),
            row((3300, 5500), (12, 24), (0, 18), true, (0, 500), "Second offense mid range PCA"),
            row(
                (5500, 11000),
                (24, 60),
                (0, 24),
                true,
                (0, 750),
                "Third or subsequent offense mid range PCA",
            ),
        ],
        // High range (0.15+)
        [
            row((3300, 5500), (12, 36), (0, 18), true, (0, 500), "First offense high range PCA"),
            row((5500, 11000), (24, 60), (0, 24), true, (0, 750), "Second offense high range PCA"),
            row(
                (11000, 22000),
                (36, 120),
                (0, 36),
                true,
                (0, 1000),
                "Third or subsequent offense high range PCA",
            ),
        ],
    ],
};

impl RuleTable {
    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn jurisdiction(&self) -> &'static str {
        self.jurisdiction
    }

    pub fn row(&self, range: BacRange, category: OffenseCategory) -> &PenaltyRow {
        &self.rows[band_index(range)][category_index(category)]
    }

    pub fn lookup(&self, range: BacRange, category: OffenseCategory) -> PenaltyBundle {
        self.row(range, category).to_bundle()
    }

    /// All 12 combinations in severity order (band-major)
    pub fn rows(&self) -> impl Iterator<Item = (BacRange, OffenseCategory, &PenaltyRow)> + '_ {
        BacRange::ALL.into_iter().flat_map(move |range| {
            OffenseCategory::ALL
                .into_iter()
                .map(move |category| (range, category, self.row(range, category)))
        })
    }
}

fn band_index(range: BacRange) -> usize {
    match range {
        BacRange::Special => 0,
        BacRange::Low => 1,
        BacRange::Mid => 2,
        BacRange::High => 3,
    }
}

fn category_index(category: OffenseCategory) -> usize {
    match category {
        OffenseCategory::First => 0,
        OffenseCategory::Second => 1,
        OffenseCategory::ThirdPlus => 2,
    }
}

/// Look up the base penalty in the deployed rule table
pub fn lookup_base_penalty(range: BacRange, category: OffenseCategory) -> PenaltyBundle {
    NSW_RULE_TABLE.lookup(range, category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_first_matches_schedule() {
        let bundle = lookup_base_penalty(BacRange::Mid, OffenseCategory::First);
        assert_eq!(bundle.fine, Range::new(2200, 3300));
        assert_eq!(bundle.license_suspension, Range::new(6, 12));
        assert!(bundle.interlock_required);
        assert_eq!(bundle.description, "First offense mid range PCA");
    }

    #[test]
    fn test_special_first_has_no_prison_exposure() {
        let bundle = lookup_base_penalty(BacRange::Special, OffenseCategory::First);
        assert!(bundle.prison_term.is_zero());
        assert!(!bundle.interlock_required);
    }

    #[test]
    fn test_all_rows_well_formed() {
        assert_eq!(NSW_RULE_TABLE.rows().count(), 12);
        for (range, category, row) in NSW_RULE_TABLE.rows() {
            assert!(
                row.to_bundle().is_well_formed(),
                "{:?}/{:?} has an inverted range",
                range,
                category
            );
        }
    }

    #[test]
    fn test_lookup_returns_independent_copy() {
        let mut bundle = lookup_base_penalty(BacRange::High, OffenseCategory::ThirdPlus);
        bundle.fine.max = 0;
        let fresh = lookup_base_penalty(BacRange::High, OffenseCategory::ThirdPlus);
        assert_eq!(fresh.fine.max, 22000);
    }

    #[test]
    fn test_bundle_serializes_camel_case() {
        let bundle = lookup_base_penalty(BacRange::Low, OffenseCategory::First);
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["licenseSuspension"]["max"], 6);
        assert_eq!(json["interlock"], false);
        assert_eq!(json["communityService"]["max"], 200);
    }
}
