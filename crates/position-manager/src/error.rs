//! Error taxonomy surfaced to presentation code

use range_core::RangeCoreError;
use thiserror::Error;

use crate::ports::PortError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// Unparsable or out-of-domain input; cleared locally
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A range edit collapsed below one tick spacing; the range is unchanged
    #[error("Range too narrow: {0}")]
    RangeTooNarrow(String),

    /// A response arrived after newer input superseded it
    #[error("Stale result for generation {0}")]
    StaleResult(u64),

    #[error("Service failure in {service}: {reason}")]
    ServiceFailure { service: &'static str, reason: String },

    #[error("Rejected by user")]
    UserRejection,

    #[error("Transaction failed: {0}")]
    TransactionFailure(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No transaction plan prepared")]
    NoPlan,

    #[error("A transaction step is already in progress")]
    StepInProgress,
}

pub type PositionResult<T> = Result<T, PositionError>;

impl PositionError {
    /// Convert a failed query (math, approval, pool state)
    pub fn from_query(service: &'static str, err: PortError) -> Self {
        match err {
            PortError::UserRejected => PositionError::UserRejection,
            other => PositionError::ServiceFailure {
                service,
                reason: other.to_string(),
            },
        }
    }

    /// Convert a failed signature or transaction submission
    pub fn from_submission(err: PortError) -> Self {
        match err {
            PortError::UserRejected => PositionError::UserRejection,
            other => PositionError::TransactionFailure(other.to_string()),
        }
    }

    /// Whether presentation code should show this to the user
    pub fn is_surfaced(&self) -> bool {
        !matches!(self, PositionError::UserRejection | PositionError::StaleResult(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PositionError::ServiceFailure { .. }
                | PositionError::TransactionFailure(_)
                | PositionError::UserRejection
        )
    }
}

impl From<RangeCoreError> for PositionError {
    fn from(err: RangeCoreError) -> Self {
        match err {
            RangeCoreError::RangeTooNarrow { .. } => PositionError::RangeTooNarrow(err.to_string()),
            other => PositionError::InvalidInput(other.to_string()),
        }
    }
}
