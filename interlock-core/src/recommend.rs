//! Personalised recommendations and preparation timeline

use crate::case::{parse_case_date, CaseRecord};
use crate::error::AssessResult;
use crate::narrative::{strings, CourtPreparation, NarrativeReport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePhase {
    pub phase: String,
    /// ISO date, only for the court appearance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub immediate: Vec<String>,
    pub mitigation: Vec<String>,
    pub court_prep: CourtPreparation,
    pub timeline: Vec<TimelinePhase>,
}

fn phase(name: &str, date: Option<String>, tasks: &[&str]) -> TimelinePhase {
    TimelinePhase {
        phase: name.to_string(),
        date,
        tasks: strings(tasks),
    }
}

/// Preparation phases leading to court
///
/// A court appearance phase is appended when a court date is given. Blank
/// dates count as absent.
pub fn generate_timeline(court_date: Option<&str>) -> AssessResult<Vec<TimelinePhase>> {
    let mut timeline = vec![
        phase(
            "Immediate (0-7 days)",
            None,
            &[
                "Engage qualified DUI lawyer",
                "Gather all documentation",
                "Request police facts",
            ],
        ),
        phase(
            "Preparation (1-4 weeks)",
            None,
            &[
                "Review evidence with lawyer",
                "Identify defense strategies",
                "Collect character references",
            ],
        ),
        phase(
            "Pre-Court (4-8 weeks)",
            None,
            &[
                "Complete any required programs",
                "Prepare mitigation evidence",
                "Consider plea negotiations",
            ],
        ),
    ];

    let court_date = court_date
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(parse_case_date)
        .transpose()?;
    if let Some(court_date) = court_date {
        timeline.push(phase(
            "Court Appearance",
            Some(court_date.format("%Y-%m-%d").to_string()),
            &[
                "Attend court with lawyer",
                "Present defense case",
                "Receive judgment",
            ],
        ));
    }

    Ok(timeline)
}

/// Recommendations drawn from a case report
pub fn recommendations(report: &NarrativeReport, case: &CaseRecord) -> AssessResult<Recommendations> {
    Ok(Recommendations {
        immediate: report.recommended_next_steps.clone(),
        mitigation: report.mitigation_strategies.clone(),
        court_prep: report.court_preparation.clone(),
        timeline: generate_timeline(case.court_date.as_deref())?,
    })
}
