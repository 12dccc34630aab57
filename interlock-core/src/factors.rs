//! Mitigating and aggravating sentencing factors triggered by case facts

use crate::case::CaseRecord;
use crate::charges::AdditionalCharge;
use crate::classify::{classify_bac, BacRange};
use serde::{Deserialize, Serialize};

/// Factors a sentencing court weighs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentencingFactor {
    // Mitigating
    FirstOffense,
    LowBacReading,
    MedicalCircumstances,
    // Aggravating
    HighBacReading,
    RepeatOffense,
    DangerousDriving,
    ProvisionalLicense,
    RefusedBreathTest,
    DrivingWhileSuspended,
}

impl SentencingFactor {
    pub fn is_mitigating(&self) -> bool {
        matches!(
            self,
            SentencingFactor::FirstOffense
                | SentencingFactor::LowBacReading
                | SentencingFactor::MedicalCircumstances
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SentencingFactor::FirstOffense => "First offense",
            SentencingFactor::LowBacReading => "Low BAC reading",
            SentencingFactor::MedicalCircumstances => "Medical/personal circumstances",
            SentencingFactor::HighBacReading => "High BAC reading",
            SentencingFactor::RepeatOffense => "Repeat offense",
            SentencingFactor::DangerousDriving => "Dangerous driving",
            SentencingFactor::ProvisionalLicense => "Learner/Provisional license",
            SentencingFactor::RefusedBreathTest => "Refused breath test",
            SentencingFactor::DrivingWhileSuspended => "Drive while license suspended",
        }
    }
}

/// Factors split by direction, in detection order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentencingFactors {
    pub mitigating: Vec<SentencingFactor>,
    pub aggravating: Vec<SentencingFactor>,
}

impl SentencingFactors {
    fn push(&mut self, factor: SentencingFactor) {
        let list = if factor.is_mitigating() {
            &mut self.mitigating
        } else {
            &mut self.aggravating
        };
        if !list.contains(&factor) {
            list.push(factor);
        }
    }

    pub fn aggravating_labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.aggravating.iter().map(SentencingFactor::label)
    }

    pub fn mitigating_labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mitigating.iter().map(SentencingFactor::label)
    }
}

/// Detect the factors a case triggers
///
/// `charges` are the already-resolved additional charges.
pub fn sentencing_factors(case: &CaseRecord, charges: &[AdditionalCharge]) -> SentencingFactors {
    let mut factors = SentencingFactors::default();

    if case.prior_offenses <= 0 {
        factors.push(SentencingFactor::FirstOffense);
    } else {
        factors.push(SentencingFactor::RepeatOffense);
    }

    match classify_bac(case.bac_level) {
        Some(BacRange::High) => factors.push(SentencingFactor::HighBacReading),
        Some(BacRange::Special | BacRange::Low) | None => {
            factors.push(SentencingFactor::LowBacReading)
        }
        Some(BacRange::Mid) => {}
    }

    if case.medical_conditions().is_some() || case.medications().is_some() {
        factors.push(SentencingFactor::MedicalCircumstances);
    }
    if case.is_provisional_license() {
        factors.push(SentencingFactor::ProvisionalLicense);
    }

    for charge in charges {
        factors.push(match charge {
            AdditionalCharge::RefuseBreathTest => SentencingFactor::RefusedBreathTest,
            AdditionalCharge::DangerousDriving => SentencingFactor::DangerousDriving,
            AdditionalCharge::DriveWhileSuspended => SentencingFactor::DrivingWhileSuspended,
        });
    }

    factors
}
