//! Penalty calculation orchestration - ties together classification, the
//! rule table, charge aggregation and risk estimation

use crate::charges::{apply_additional_charges, resolve_charges, AdditionalCharge, ChargeMode};
use crate::classify::{classify_offense_count, require_bac_range, BacRange, OffenseCategory};
use crate::error::AssessResult;
use crate::penalty::{PenaltyBundle, NSW_RULE_TABLE};
use crate::risk::{estimate_risk_with_thresholds, RiskLevel, RiskThresholds};
use serde::{Deserialize, Serialize};

/// Input of a penalty calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyRequest {
    pub bac_level: f64,
    #[serde(default)]
    pub prior_offenses: i64,
    #[serde(default)]
    pub additional_charges: Vec<String>,
}

impl PenaltyRequest {
    pub fn new(bac_level: f64, prior_offenses: i64) -> Self {
        PenaltyRequest {
            bac_level,
            prior_offenses,
            additional_charges: Vec::new(),
        }
    }

    pub fn with_charges<I, S>(mut self, charges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_charges = charges.into_iter().map(Into::into).collect();
        self
    }
}

/// Penalty verdict with classification metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyAssessment {
    pub bac_level: f64,
    pub bac_range: BacRange,
    pub offense_category: OffenseCategory,
    pub penalty: PenaltyBundle,
    pub risk_level: RiskLevel,
    pub additional_charges: Vec<AdditionalCharge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_charges: Vec<String>,
    pub rule_table_version: String,
}

/// Options controlling a calculation
#[derive(Debug, Clone, Copy, Default)]
pub struct AssessOptions {
    pub charge_mode: ChargeMode,
    pub risk_thresholds: RiskThresholds,
}

/// Calculate the penalty exposure for one request
///
/// Fails when the BAC reading is invalid or below every band, when priors
/// are negative, and (in strict mode) on unknown charge names.
pub fn calculate_penalty(
    request: &PenaltyRequest,
    options: &AssessOptions,
) -> AssessResult<PenaltyAssessment> {
    let bac_range = require_bac_range(request.bac_level)?;
    let offense_category = classify_offense_count(request.prior_offenses)?;
    let resolved = resolve_charges(request.additional_charges.as_slice(), options.charge_mode)?;

    let base = NSW_RULE_TABLE.lookup(bac_range, offense_category);
    let penalty = apply_additional_charges(&base, &resolved.charges);

    Ok(PenaltyAssessment {
        bac_level: request.bac_level,
        bac_range,
        offense_category,
        penalty,
        risk_level: estimate_risk_with_thresholds(
            request.bac_level,
            request.prior_offenses,
            &options.risk_thresholds,
        ),
        additional_charges: resolved.charges,
        ignored_charges: resolved.ignored,
        rule_table_version: NSW_RULE_TABLE.version().to_string(),
    })
}

/// Calculate a batch of independent requests, preserving order
pub fn calculate_batch(
    requests: &[PenaltyRequest],
    options: &AssessOptions,
) -> Vec<AssessResult<PenaltyAssessment>> {
    requests
        .iter()
        .map(|request| calculate_penalty(request, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssessError;
    use crate::penalty::Range;

    #[test]
    fn test_request_defaults() {
        let request: PenaltyRequest = serde_json::from_str(r#"{"bacLevel": 0.1}"#).unwrap();
        assert_eq!(request, PenaltyRequest::new(0.1, 0));
    }

    #[test]
    fn test_calculate_high_third_plus() {
        let assessment =
            calculate_penalty(&PenaltyRequest::new(0.16, 2), &AssessOptions::default()).unwrap();
        assert_eq!(assessment.bac_range, BacRange::High);
        assert_eq!(assessment.offense_category, OffenseCategory::ThirdPlus);
        assert_eq!(assessment.penalty.fine, Range::new(11000, 22000));
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.rule_table_version, "nsw-rta-2013");
    }

    #[test]
    fn test_unknown_charge_lenient_vs_strict() {
        let request = PenaltyRequest::new(0.09, 0).with_charges(["DRUNK_IN_CHARGE"]);
        let lenient = calculate_penalty(&request, &AssessOptions::default()).unwrap();
        assert_eq!(lenient.ignored_charges, vec!["DRUNK_IN_CHARGE".to_string()]);
        assert!(lenient.additional_charges.is_empty());

        let strict = AssessOptions {
            charge_mode: ChargeMode::Strict,
            ..Default::default()
        };
        assert_eq!(
            calculate_penalty(&request, &strict).unwrap_err(),
            AssessError::UnknownCharge("DRUNK_IN_CHARGE".into())
        );
    }

    #[test]
    fn test_below_special_range_is_error() {
        let err = calculate_penalty(&PenaltyRequest::new(0.015, 0), &AssessOptions::default())
            .unwrap_err();
        assert!(matches!(err, AssessError::UnclassifiableBac { .. }));
    }

    #[test]
    fn test_batch_preserves_order_and_errors() {
        let requests = vec![
            PenaltyRequest::new(0.03, 0),
            PenaltyRequest::new(-0.2, 0),
            PenaltyRequest::new(0.2, 1),
        ];
        let results = calculate_batch(&requests, &AssessOptions::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().bac_range, BacRange::Special);
        assert!(results[1].is_err());
        assert_eq!(
            results[2].as_ref().unwrap().offense_category,
            OffenseCategory::Second
        );
    }

    #[test]
    fn test_ignored_charges_omitted_from_json_when_empty() {
        let assessment =
            calculate_penalty(&PenaltyRequest::new(0.083, 0), &AssessOptions::default()).unwrap();
        let json = serde_json::to_value(&assessment).unwrap();
        assert!(json.get("ignoredCharges").is_none());
        assert_eq!(json["bacRange"], "MID_RANGE");
        assert_eq!(json["offenseCategory"], "first");
        assert_eq!(json["riskLevel"], "MEDIUM");
    }
}
