//! Interlock core library - DUI penalty calculation and case risk assessment

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Penalty figures come only from the static rule table and the charge
//   aggregator, whichever analyst produced a report
// - Classification is total over valid readings and monotone in BAC and priors
// - Invalid input is rejected, never coerced
// - The only shared mutable state is the rate limiter's counters
// - Identical input yields identical output on the heuristic path

pub mod analysis;
pub mod analyst;
pub mod case;
pub mod charges;
pub mod classify;
pub mod config;
pub mod defense;
pub mod error;
pub mod factors;
pub mod narrative;
pub mod penalty;
pub mod rate_limit;
pub mod recommend;
pub mod report;
pub mod risk;
pub mod scoring;

pub use analysis::{calculate_batch, calculate_penalty, AssessOptions, PenaltyAssessment, PenaltyRequest};
pub use analyst::{analyst_from_config, analyze_case, health, CaseAnalyst, HealthReport};
pub use case::CaseRecord;
pub use charges::{AdditionalCharge, ChargeMode};
pub use classify::{BacRange, OffenseCategory};
pub use config::ResolvedConfig;
pub use error::{AssessError, AssessResult};
pub use narrative::NarrativeReport;
pub use penalty::{PenaltyBundle, Range, NSW_RULE_TABLE};
pub use risk::RiskLevel;
