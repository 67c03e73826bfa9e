//! Transition table for seismic event review.
//!
//! The table is a pure function of the current state and the requested
//! operation. [`apply`] is the only place that writes to an event's history.

use chrono::{DateTime, Utc};
use shared::{
    domain::{Analyst, ReviewOperation, ReviewState},
    error::ReviewError,
};

use crate::event::{SeismicEvent, StateChange};

/// Result of looking up one cell of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The operation is accepted but produces no new record.
    Stay,
    /// The operation moves the event into a new state.
    Enter(ReviewState),
}

pub fn transition(from: ReviewState, operation: ReviewOperation) -> Result<Step, ReviewError> {
    use ReviewOperation as Op;
    use ReviewState as S;

    match (from, operation) {
        (S::Confirmed | S::Rejected | S::Derived, _) => Err(ReviewError::TerminalState {
            state: from,
            operation,
        }),

        (S::AutoDetected | S::PendingReview, Op::Review) => Ok(Step::Enter(S::BlockedInReview)),
        (S::AutoDetected | S::PendingReview, Op::Confirm | Op::Reject | Op::Derive) => {
            Err(ReviewError::InvalidTransition { from, operation })
        }

        (S::BlockedInReview, Op::Review) => Ok(Step::Stay),
        (S::BlockedInReview, Op::Confirm) => Ok(Step::Enter(S::Confirmed)),
        (S::BlockedInReview, Op::Reject) => Ok(Step::Enter(S::Rejected)),
        (S::BlockedInReview, Op::Derive) => Ok(Step::Enter(S::Derived)),
    }
}

/// Whether some operation moves an event from `from` into `to`.
pub fn can_enter(from: ReviewState, to: ReviewState) -> bool {
    [
        ReviewOperation::Review,
        ReviewOperation::Confirm,
        ReviewOperation::Reject,
        ReviewOperation::Derive,
    ]
    .into_iter()
    .any(|operation| transition(from, operation) == Ok(Step::Enter(to)))
}

/// Runs `operation` against `event` at `now`.
///
/// On `Step::Enter` the open record is closed at `now` and a new open record
/// is appended; it is returned so the caller can persist it. The acting
/// analyst is recorded unless the operation is system-initiated. On error the
/// event is left untouched.
pub fn apply(
    event: &mut SeismicEvent,
    operation: ReviewOperation,
    now: DateTime<Utc>,
    actor: Option<&Analyst>,
) -> Result<Option<StateChange>, ReviewError> {
    match transition(event.current_state(), operation)? {
        Step::Stay => Ok(None),
        Step::Enter(next) => {
            let responsible = if operation.is_system_initiated() {
                None
            } else {
                actor.cloned()
            };
            let appended = event.push_change(StateChange::open(now, next, responsible));
            Ok(Some(appended.clone()))
        }
    }
}

#[cfg(test)]
#[path = "tests/state_model_tests.rs"]
mod tests;
