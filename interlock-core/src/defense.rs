//! Defense strategy suggestions

use crate::case::CaseRecord;
use crate::narrative::strings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefenseStrategies {
    pub strategies: Vec<String>,
    pub technical_defenses: Vec<String>,
    pub mitigation_arguments: Vec<String>,
}

/// Strategies worth raising with a lawyer for this case
///
/// Medical conditions and medications each add a strategy.
pub fn defense_strategies(case: &CaseRecord) -> DefenseStrategies {
    let mut strategies = strings(&[
        "Challenge breathalyzer calibration and maintenance records",
        "Review police training and certification for testing procedures",
        "Examine 20-minute observation period compliance",
        "Investigate potential medical conditions affecting BAC readings",
        "Challenge the legality of the initial traffic stop",
        "Review evidence handling and chain of custody procedures",
    ]);
    if case.medical_conditions().is_some() {
        strategies.push("Present medical evidence that may affect BAC accuracy".to_string());
    }
    if case.medications().is_some() {
        strategies.push("Examine medication interactions with alcohol testing".to_string());
    }

    let mut mitigation_arguments = Vec::new();
    if case.prior_offenses == 0 {
        mitigation_arguments.push("First offense considerations".to_string());
    }
    mitigation_arguments.extend(strings(&[
        "Employment impact statements",
        "Character reference letters",
        "Voluntary rehabilitation programs",
    ]));

    DefenseStrategies {
        strategies,
        technical_defenses: strings(&[
            "Breathalyzer accuracy challenges",
            "Procedural compliance review",
            "Evidence admissibility issues",
        ]),
        mitigation_arguments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_strategies() {
        let defenses = defense_strategies(&CaseRecord::new(0.09, 0));
        assert_eq!(defenses.strategies.len(), 6);
        assert_eq!(defenses.technical_defenses.len(), 3);
        assert_eq!(defenses.mitigation_arguments[0], "First offense considerations");
    }

    #[test]
    fn test_medical_extensions() {
        let mut case = CaseRecord::new(0.09, 1);
        case.medical_conditions = Some("reflux".into());
        case.medications = Some("ventolin".into());
        let defenses = defense_strategies(&case);
        assert_eq!(defenses.strategies.len(), 8);
        assert!(!defenses
            .mitigation_arguments
            .contains(&"First offense considerations".to_string()));
    }
}
