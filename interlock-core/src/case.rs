//! Case description record consumed by analysis

use crate::charges::{resolve_charges, ChargeMode, ResolvedCharges};
use crate::classify::{classify_offense_count, validate_bac};
use crate::error::{AssessError, AssessResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A DUI case as described by the person facing the charge
///
/// Only `bacLevel` is required. Free-text fields are carried through to
/// the narrative and never interpreted beyond presence checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub bac_level: f64,
    #[serde(default)]
    pub prior_offenses: i64,
    #[serde(default)]
    pub additional_charges: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrest_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    /// Reason for the stop (random breath test, crash, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_circumstances: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_conditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<String>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl CaseRecord {
    pub fn new(bac_level: f64, prior_offenses: i64) -> Self {
        CaseRecord {
            bac_level,
            prior_offenses,
            ..Default::default()
        }
    }

    /// Check the fields analysis depends on
    ///
    /// BAC must be a valid reading and priors non-negative. The court date,
    /// when present, must be an ISO date.
    pub fn validate(&self) -> AssessResult<()> {
        validate_bac(self.bac_level)?;
        classify_offense_count(self.prior_offenses)?;
        self.parsed_court_date()?;
        Ok(())
    }

    pub fn parsed_court_date(&self) -> AssessResult<Option<NaiveDate>> {
        non_empty(&self.court_date)
            .map(parse_case_date)
            .transpose()
    }

    pub fn charges(&self, mode: ChargeMode) -> AssessResult<ResolvedCharges> {
        resolve_charges(self.additional_charges.as_slice(), mode)
    }

    pub fn medical_conditions(&self) -> Option<&str> {
        non_empty(&self.medical_conditions)
    }

    pub fn medications(&self) -> Option<&str> {
        non_empty(&self.medications)
    }

    pub fn reason(&self) -> Option<&str> {
        non_empty(&self.reason)
    }

    /// Learner and provisional (P1/P2) licence holders
    pub fn is_provisional_license(&self) -> bool {
        non_empty(&self.license_type).is_some_and(|t| {
            let t = t.to_ascii_lowercase();
            t.contains("learner") || t.contains("provisional") || t == "p1" || t == "p2"
        })
    }
}

/// Parse a case date, accepting a bare ISO date or an RFC 3339 timestamp
pub fn parse_case_date(raw: &str) -> AssessResult<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split('T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| AssessError::InvalidCase(format!("invalid date '{}': {}", raw, e)))
}
