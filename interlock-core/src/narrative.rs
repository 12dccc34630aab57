//! Structured case narrative
//!
//! The heuristic generator fills a fixed template from the case record.
//! Penalty numbers always come from the rule table and charge aggregator,
//! so a narrative can never disagree with a penalty calculation for the
//! same inputs.

use crate::analysis::AssessOptions;
use crate::case::CaseRecord;
use crate::charges::{apply_additional_charges, AdditionalCharge};
use crate::classify::{classify_bac, classify_offense_count};
use crate::error::AssessResult;
use crate::factors::sentencing_factors;
use crate::penalty::{lookup_base_penalty, PenaltyBundle, Range};
use crate::risk::{estimate_risk_with_thresholds, RiskLevel};
use crate::scoring::case_score;
use serde::{Deserialize, Serialize};

const INTERLOCK_DURATION: &str = "Minimum 12 months";

pub(crate) const DISCLAIMER: &str =
    "This is an automated estimate. For actual legal advice, consult a qualified NSW DUI lawyer.";

/// Which analyst produced a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    #[default]
    Heuristic,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
    /// 10..=100
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterlockTerm {
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Imprisonment {
    pub possible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityService {
    pub hours: Range,
}

/// Penalty section of a narrative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikelyPenalties {
    pub fine: Range,
    pub license_suspension: Range,
    pub interlock: InterlockTerm,
    pub imprisonment: Imprisonment,
    pub community_service: CommunityService,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl LikelyPenalties {
    pub fn from_bundle(bundle: &PenaltyBundle) -> Self {
        LikelyPenalties {
            fine: bundle.fine,
            license_suspension: bundle.license_suspension,
            interlock: InterlockTerm {
                required: bundle.interlock_required,
                duration: bundle
                    .interlock_required
                    .then(|| INTERLOCK_DURATION.to_string()),
            },
            imprisonment: Imprisonment {
                possible: bundle.prison_term.max > 0,
                duration: (bundle.prison_term.max > 0)
                    .then(|| format!("Up to {} months", bundle.prison_term.max)),
            },
            community_service: CommunityService {
                hours: bundle.community_service,
            },
            note: Some(bundle.description.clone()),
        }
    }

    /// Reading below every PCA band
    pub fn none() -> Self {
        LikelyPenalties {
            fine: Range::ZERO,
            license_suspension: Range::ZERO,
            interlock: InterlockTerm {
                required: false,
                duration: None,
            },
            imprisonment: Imprisonment {
                possible: false,
                duration: None,
            },
            community_service: CommunityService { hours: Range::ZERO },
            note: Some("No prescribed concentration of alcohol offense".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtPreparation {
    pub timeline: String,
    pub required_documents: Vec<String>,
    pub expectations: String,
}

/// Structured legal-risk report for one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeReport {
    pub risk_assessment: RiskAssessment,
    pub likely_penalties: LikelyPenalties,
    pub defense_opportunities: Vec<String>,
    pub recommended_next_steps: Vec<String>,
    pub mitigation_strategies: Vec<String>,
    pub court_preparation: CourtPreparation,
    #[serde(default)]
    pub source: ReportSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Penalties for a case, routed through the rule table
///
/// Readings below the special range produce [`LikelyPenalties::none`].
pub fn likely_penalties(
    case: &CaseRecord,
    charges: &[AdditionalCharge],
) -> AssessResult<LikelyPenalties> {
    let category = classify_offense_count(case.prior_offenses)?;
    Ok(match classify_bac(case.bac_level) {
        Some(range) => {
            let base = lookup_base_penalty(range, category);
            LikelyPenalties::from_bundle(&apply_additional_charges(&base, charges))
        }
        None => LikelyPenalties::none(),
    })
}

/// Build the heuristic narrative for a case
pub fn build_narrative(case: &CaseRecord, options: &AssessOptions) -> AssessResult<NarrativeReport> {
    case.validate()?;
    compose_narrative(case, options)
}

/// Heuristic narrative for a case that has already been validated
pub(crate) fn compose_narrative(
    case: &CaseRecord,
    options: &AssessOptions,
) -> AssessResult<NarrativeReport> {
    let charges = case.charges(options.charge_mode)?.charges;
    let first_offense = case.prior_offenses == 0;

    let mut factors = vec![
        bac_factor(case.bac_level),
        if first_offense {
            "First offense".to_string()
        } else {
            format!("Repeat offense ({} prior)", case.prior_offenses)
        },
        format!("Arrested via {}", case.reason().unwrap_or("traffic stop")),
    ];
    factors.extend(
        sentencing_factors(case, &charges)
            .aggravating_labels()
            .filter(|label| *label != "Repeat offense")
            .map(str::to_string),
    );

    Ok(NarrativeReport {
        risk_assessment: RiskAssessment {
            level: estimate_risk_with_thresholds(
                case.bac_level,
                case.prior_offenses,
                &options.risk_thresholds,
            ),
            factors,
            score: case_score(case.bac_level, case.prior_offenses),
        },
        likely_penalties: likely_penalties(case, &charges)?,
        defense_opportunities: defense_opportunities(case),
        recommended_next_steps: strings(&[
            "Engage an experienced DUI lawyer immediately",
            "Gather all relevant documentation",
            "Request police facts and evidence",
            "Consider early plea negotiations",
            "Explore alternative sentencing options",
        ]),
        mitigation_strategies: strings(&[
            "Demonstrate remorse and responsibility",
            "Complete voluntary alcohol education program",
            "Provide employment and character references",
            "Show financial impact of penalties",
            "Present any medical or personal circumstances",
        ]),
        court_preparation: CourtPreparation {
            timeline: "2-6 months from charge date".to_string(),
            required_documents: strings(&[
                "Notice of court attendance",
                "Police facts sheet",
                "Driving record abstract",
                "Character references",
                "Financial statements",
            ]),
            expectations: "Court will consider BAC level, prior history, and mitigation evidence when determining penalty".to_string(),
        },
        source: ReportSource::Heuristic,
        disclaimer: Some(DISCLAIMER.to_string()),
        raw_response: None,
    })
}

fn bac_factor(bac: f64) -> String {
    match classify_bac(bac) {
        Some(range) => format!("BAC of {:.3} falls in the {} band", bac, range.label()),
        None => format!(
            "BAC of {:.3} is below the prescribed concentration offense bands",
            bac
        ),
    }
}

fn defense_opportunities(case: &CaseRecord) -> Vec<String> {
    let mut opportunities = strings(&[
        "Challenge BAC test accuracy and calibration",
        "Review arrest procedures for compliance",
        "Examine evidence chain of custody",
    ]);
    opportunities.push(if case.prior_offenses == 0 {
        "Seek first offender considerations".to_string()
    } else {
        "Argue for rehabilitation over punishment".to_string()
    });
    opportunities.push("Present character references and mitigation evidence".to_string());
    if let Some(conditions) = case.medical_conditions() {
        opportunities.push(format!(
            "Present medical evidence that may affect BAC accuracy ({})",
            conditions
        ));
    }
    if let Some(medications) = case.medications() {
        opportunities.push(format!(
            "Examine medication interactions with alcohol testing ({})",
            medications
        ));
    }
    opportunities
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{calculate_penalty, PenaltyRequest};
    use crate::error::AssessError;

    #[test]
    fn test_narrative_penalties_match_calculator() {
        let mut case = CaseRecord::new(0.083, 0);
        case.additional_charges = vec!["REFUSE_BREATH_TEST".into()];
        let report = build_narrative(&case, &AssessOptions::default()).unwrap();

        let assessment = calculate_penalty(
            &PenaltyRequest::new(0.083, 0).with_charges(["REFUSE_BREATH_TEST"]),
            &AssessOptions::default(),
        )
        .unwrap();
        assert_eq!(report.likely_penalties.fine, assessment.penalty.fine);
        assert_eq!(
            report.likely_penalties.license_suspension,
            assessment.penalty.license_suspension
        );
        assert_eq!(
            report.likely_penalties.interlock.required,
            assessment.penalty.interlock_required
        );
    }

    #[test]
    fn test_risk_section() {
        let report = build_narrative(&CaseRecord::new(0.16, 2), &AssessOptions::default()).unwrap();
        assert_eq!(report.risk_assessment.level, RiskLevel::High);
        assert_eq!(report.risk_assessment.score, 56);
        assert_eq!(
            report.risk_assessment.factors[0],
            "BAC of 0.160 falls in the High Range PCA band"
        );
        assert_eq!(report.risk_assessment.factors[1], "Repeat offense (2 prior)");
        assert!(report
            .risk_assessment
            .factors
            .contains(&"High BAC reading".to_string()));
    }

    #[test]
    fn test_below_bands_yields_no_penalties() {
        let report = build_narrative(&CaseRecord::new(0.01, 0), &AssessOptions::default()).unwrap();
        assert_eq!(report.likely_penalties, LikelyPenalties::none());
        assert_eq!(report.risk_assessment.level, RiskLevel::Low);
        assert_eq!(report.risk_assessment.score, 10);
    }

    #[test]
    fn test_invalid_bac_rejected() {
        let err = build_narrative(&CaseRecord::new(-0.01, 0), &AssessOptions::default())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_medical_fields_extend_defenses() {
        let mut case = CaseRecord::new(0.09, 0);
        let base = build_narrative(&case, &AssessOptions::default()).unwrap();
        assert_eq!(base.defense_opportunities.len(), 5);
        assert!(base
            .defense_opportunities
            .contains(&"Seek first offender considerations".to_string()));

        case.medical_conditions = Some("diabetes".into());
        case.medications = Some("metformin".into());
        let extended = build_narrative(&case, &AssessOptions::default()).unwrap();
        assert_eq!(extended.defense_opportunities.len(), 7);
    }

    #[test]
    fn test_imprisonment_and_interlock_wording() {
        let report = build_narrative(&CaseRecord::new(0.03, 0), &AssessOptions::default()).unwrap();
        assert!(!report.likely_penalties.imprisonment.possible);
        assert!(!report.likely_penalties.interlock.required);

        let report = build_narrative(&CaseRecord::new(0.09, 0), &AssessOptions::default()).unwrap();
        assert_eq!(
            report.likely_penalties.imprisonment.duration.as_deref(),
            Some("Up to 12 months")
        );
        assert_eq!(
            report.likely_penalties.interlock.duration.as_deref(),
            Some(INTERLOCK_DURATION)
        );
    }

    #[test]
    fn test_strict_mode_propagates_unknown_charge() {
        let mut case = CaseRecord::new(0.09, 0);
        case.additional_charges = vec!["SPEEDING".into()];
        let options = AssessOptions {
            charge_mode: crate::charges::ChargeMode::Strict,
            ..Default::default()
        };
        assert_eq!(
            build_narrative(&case, &options).unwrap_err(),
            AssessError::UnknownCharge("SPEEDING".into())
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = build_narrative(&CaseRecord::new(0.09, 0), &AssessOptions::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["riskAssessment"]["level"], "MEDIUM");
        assert_eq!(json["likelyPenalties"]["communityService"]["hours"]["max"], 300);
        assert_eq!(json["courtPreparation"]["requiredDocuments"][0], "Notice of court attendance");
        assert_eq!(json["source"], "heuristic");
        assert!(json.get("rawResponse").is_none());
    }
}
