use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(EventId);

/// Username of the analyst acting on an event.
///
/// Opaque to the review workflow: it is only copied into the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Analyst(String);

impl Analyst {
    /// Returns `None` for blank names so "no analyst" is never a magic string.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Analyst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    AutoDetected,
    PendingReview,
    BlockedInReview,
    Confirmed,
    Rejected,
    Derived,
}

impl ReviewState {
    pub const ALL: [ReviewState; 6] = [
        ReviewState::AutoDetected,
        ReviewState::PendingReview,
        ReviewState::BlockedInReview,
        ReviewState::Confirmed,
        ReviewState::Rejected,
        ReviewState::Derived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewState::AutoDetected => "auto_detected",
            ReviewState::PendingReview => "pending_review",
            ReviewState::BlockedInReview => "blocked_in_review",
            ReviewState::Confirmed => "confirmed",
            ReviewState::Rejected => "rejected",
            ReviewState::Derived => "derived",
        }
    }

    /// Final dispositions accept no further operation.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReviewState::Confirmed | ReviewState::Rejected | ReviewState::Derived
        )
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReviewState(pub String);

impl fmt::Display for UnknownReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown review state '{}'", self.0)
    }
}

impl std::error::Error for UnknownReviewState {}

impl FromStr for ReviewState {
    type Err = UnknownReviewState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownReviewState(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOperation {
    Review,
    Confirm,
    Reject,
    Derive,
}

impl ReviewOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewOperation::Review => "review",
            ReviewOperation::Confirm => "confirm",
            ReviewOperation::Reject => "reject",
            ReviewOperation::Derive => "derive",
        }
    }

    /// Review is performed by the system when an event is locked; it never
    /// records a responsible analyst.
    pub fn is_system_initiated(self) -> bool {
        matches!(self, ReviewOperation::Review)
    }
}

impl fmt::Display for ReviewOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event category an analyst designates as the subject of a disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTarget {
    Reach,
    Classification,
    Origin,
}

impl ActionTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionTarget::Reach => "reach",
            ActionTarget::Classification => "classification",
            ActionTarget::Origin => "origin",
        }
    }
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_state_names_round_trip_through_from_str() {
        for state in ReviewState::ALL {
            assert_eq!(state.as_str().parse::<ReviewState>(), Ok(state));
        }
        assert!("archived".parse::<ReviewState>().is_err());
    }

    #[test]
    fn only_dispositions_are_terminal() {
        let terminal: Vec<_> = ReviewState::ALL
            .into_iter()
            .filter(|state| state.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                ReviewState::Confirmed,
                ReviewState::Rejected,
                ReviewState::Derived
            ]
        );
    }

    #[test]
    fn blank_analyst_names_are_rejected() {
        assert!(Analyst::new("   ").is_none());
        assert_eq!(
            Analyst::new(" analyst1 ").map(|a| a.to_string()),
            Some("analyst1".to_string())
        );
    }

    #[test]
    fn review_state_serializes_as_snake_case() {
        let json = serde_json::to_string(&ReviewState::BlockedInReview).expect("json");
        assert_eq!(json, "\"blocked_in_review\"");
    }
}
