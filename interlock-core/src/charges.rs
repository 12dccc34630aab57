//! Additional charges and penalty aggregation
//!
//! Cost-like fields stack additively; duration-like maxima take the worst
//! single controlling charge. Aggregation is order-independent.

use crate::error::{AssessError, AssessResult};
use crate::penalty::{PenaltyBundle, Range};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Independently triggered charge accompanying a PCA offense
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdditionalCharge {
    RefuseBreathTest,
    DangerousDriving,
    DriveWhileSuspended,
}

impl AdditionalCharge {
    pub const ALL: [AdditionalCharge; 3] = [
        AdditionalCharge::RefuseBreathTest,
        AdditionalCharge::DangerousDriving,
        AdditionalCharge::DriveWhileSuspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdditionalCharge::RefuseBreathTest => "REFUSE_BREATH_TEST",
            AdditionalCharge::DangerousDriving => "DANGEROUS_DRIVING",
            AdditionalCharge::DriveWhileSuspended => "DRIVE_WHILE_SUSPENDED",
        }
    }

    /// Penalty fragment carried by this charge
    pub fn penalty(&self) -> PenaltyBundle {
        let (fine, suspension, prison, interlock, description) = match self {
            AdditionalCharge::RefuseBreathTest => {
                ((3300, 5500), (12, 36), (0, 18), true, "Refuse breath test")
            }
            AdditionalCharge::DangerousDriving => {
                ((3300, 11000), (12, 60), (0, 36), false, "Dangerous driving")
            }
            AdditionalCharge::DriveWhileSuspended => {
                ((3300, 5500), (12, 36), (0, 18), false, "Drive while license suspended")
            }
        };
        PenaltyBundle {
            fine: Range::new(fine.0, fine.1),
            license_suspension: Range::new(suspension.0, suspension.1),
            prison_term: Range::new(prison.0, prison.1),
            interlock_required: interlock,
            community_service: Range::ZERO,
            description: description.to_string(),
        }
    }
}

impl fmt::Display for AdditionalCharge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdditionalCharge {
    type Err = AssessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdditionalCharge::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| AssessError::UnknownCharge(s.to_string()))
    }
}

/// Handling of charge identifiers that are not in the charge table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeMode {
    /// Skip unknown names with a warning and report them back
    #[default]
    Lenient,
    /// Fail on the first unknown name
    Strict,
}

/// Charges resolved from caller-supplied identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCharges {
    pub charges: Vec<AdditionalCharge>,
    pub ignored: Vec<String>,
}

/// Resolve charge identifiers according to `mode`
pub fn resolve_charges<S: AsRef<str>>(names: &[S], mode: ChargeMode) -> AssessResult<ResolvedCharges> {
    let mut resolved = ResolvedCharges::default();
    for name in names {
        let name = name.as_ref();
        match name.parse::<AdditionalCharge>() {
            Ok(charge) => resolved.charges.push(charge),
            Err(err) => match mode {
                ChargeMode::Strict => return Err(err),
                ChargeMode::Lenient => {
                    tracing::warn!(charge = name, "ignoring unknown additional charge");
                    resolved.ignored.push(name.to_string());
                }
            },
        }
    }
    Ok(resolved)
}

/// Fold additional charges into a base penalty
///
/// - fine: min and max summed
/// - license suspension max, prison term max: maximum
/// - interlock: logical OR
///
/// All other fields are carried over from `base`.
pub fn apply_additional_charges(base: &PenaltyBundle, charges: &[AdditionalCharge]) -> PenaltyBundle {
    charges.iter().fold(base.clone(), |mut total, charge| {
        let extra = charge.penalty();
        total.fine.min = total.fine.min.saturating_add(extra.fine.min);
        total.fine.max = total.fine.max.saturating_add(extra.fine.max);
        total.license_suspension.max = total
            .license_suspension
            .max
            .max(extra.license_suspension.max);
        total.prison_term.max = total.prison_term.max.max(extra.prison_term.max);
        total.interlock_required |= extra.interlock_required;
        total
    })
}
