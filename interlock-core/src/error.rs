//! Domain errors for penalty and case assessment
//!
//! Validation errors are surfaced to the caller. Live-service errors are
//! produced only on the external analyst path and are absorbed by the
//! fallback analyst.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssessError {
    #[error("unclassifiable BAC level {bac}: {reason}")]
    UnclassifiableBac { bac: f64, reason: &'static str },

    #[error("prior offense count must be non-negative (got {0})")]
    NegativePriorOffenses(i64),

    #[error("unknown additional charge: {0}")]
    UnknownCharge(String),

    #[error("invalid case record: {0}")]
    InvalidCase(String),

    #[error("live analysis service failed: {0}")]
    LiveService(String),

    #[error("live analysis rate limit exceeded")]
    RateLimited,
}

impl AssessError {
    /// True for errors caused by the caller's input (as opposed to the
    /// external service path)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AssessError::UnclassifiableBac { .. }
                | AssessError::NegativePriorOffenses(_)
                | AssessError::UnknownCharge(_)
                | AssessError::InvalidCase(_)
        )
    }
}

pub type AssessResult<T> = Result<T, AssessError>;
