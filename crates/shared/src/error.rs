use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ReviewOperation, ReviewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidTransition,
    TerminalState,
    IncompleteEventData,
    NoEventSelected,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

/// Data an event must carry before it can be given a final disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingData {
    #[error("the event has no magnitude")]
    Magnitude,
    #[error("the event has no reach category")]
    Reach,
    #[error("the event has no origin category")]
    Origin,
    #[error("no reach, classification or origin was chosen as the subject of the action")]
    ActionTarget,
    #[error("the event has no time series")]
    TimeSeries,
    #[error("time series #{index} has no samples")]
    Samples { index: usize },
}

/// Failures of the review workflow. None of them is retryable as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("cannot {operation} an event in state {from}; it must be reviewed first")]
    InvalidTransition {
        from: ReviewState,
        operation: ReviewOperation,
    },
    #[error("cannot {operation} an event already {state}")]
    TerminalState {
        state: ReviewState,
        operation: ReviewOperation,
    },
    #[error("incomplete event data: {0}")]
    IncompleteEventData(MissingData),
    #[error("no event is selected for review")]
    NoEventSelected,
    #[error("inconsistent state history: {0}")]
    InconsistentHistory(String),
}

impl ReviewError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ReviewError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            ReviewError::TerminalState { .. } => ErrorCode::TerminalState,
            ReviewError::IncompleteEventData(_) => ErrorCode::IncompleteEventData,
            ReviewError::NoEventSelected => ErrorCode::NoEventSelected,
            ReviewError::InconsistentHistory(_) => ErrorCode::Internal,
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(value: ReviewError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
