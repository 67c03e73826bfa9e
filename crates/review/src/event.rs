//! The seismic event aggregate and its value objects.
//!
//! An event exclusively owns its time series and its state history. The
//! history is append-only and can only grow through
//! [`crate::state_model::apply`]; the current state is never stored apart from
//! it, so the two cannot disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Analyst, EventId, ReviewState},
    error::ReviewError,
    protocol::{CoordinatesView, StateChangeView},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn view(self) -> CoordinatesView {
        CoordinatesView {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Magnitude {
    pub value: f64,
    pub description: String,
}

impl Magnitude {
    /// Richter magnitude with the qualitative band used by the detection
    /// network.
    pub fn richter(value: f64) -> Self {
        let description = if value <= 3.9 {
            "minor"
        } else if value <= 5.9 {
            "moderate"
        } else if value <= 6.9 {
            "strong"
        } else if value <= 7.9 {
            "major"
        } else {
            "great"
        };
        Self {
            value,
            description: description.to_string(),
        }
    }
}

/// Depth band of the hypocenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub depth_from_km: f64,
    pub depth_to_km: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reach {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seismograph {
    pub identifier: String,
    pub serial_number: String,
    pub station: Station,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    pub denomination: String,
    pub unit: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDetail {
    pub value: f64,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub taken_at: DateTime<Utc>,
    pub details: Vec<SampleDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub alarm_condition: String,
    pub window_start: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
    pub sampling_frequency_hz: f64,
    pub seismograph: Option<Seismograph>,
    pub samples: Vec<Sample>,
}

impl TimeSeries {
    pub fn station_name(&self) -> Option<&str> {
        self.seismograph.as_ref().map(|s| s.station.name.as_str())
    }
}

/// Audit entry covering the interval during which an event held `state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub since: DateTime<Utc>,
    pub state: ReviewState,
    pub responsible: Option<Analyst>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl StateChange {
    pub fn open(since: DateTime<Utc>, state: ReviewState, responsible: Option<Analyst>) -> Self {
        Self {
            since,
            state,
            responsible,
            ended_at: None,
        }
    }

    pub fn is_current(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn view(&self) -> StateChangeView {
        StateChangeView {
            state: self.state,
            since: self.since,
            ended_at: self.ended_at,
            responsible: self.responsible.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeismicEvent {
    pub id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub epicenter: Coordinates,
    pub hypocenter: Coordinates,
    pub magnitude: Option<Magnitude>,
    pub classification: Option<Classification>,
    pub origin: Option<Origin>,
    pub reach: Option<Reach>,
    pub series: Vec<TimeSeries>,
    history: Vec<StateChange>,
}

impl SeismicEvent {
    /// A freshly detected event whose history starts with one open record
    /// for `initial`, attributed to nobody.
    pub fn new(
        id: EventId,
        occurred_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        epicenter: Coordinates,
        hypocenter: Coordinates,
        initial: ReviewState,
        since: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            occurred_at,
            ended_at,
            epicenter,
            hypocenter,
            magnitude: None,
            classification: None,
            origin: None,
            reach: None,
            series: Vec::new(),
            history: vec![StateChange::open(since, initial, None)],
        }
    }

    /// Replaces the history with one loaded from storage.
    ///
    /// The history must be non-empty, at most one record may be open and, if
    /// one is, it must be the last.
    pub fn with_history(mut self, history: Vec<StateChange>) -> Result<Self, ReviewError> {
        if history.is_empty() {
            return Err(ReviewError::InconsistentHistory(format!(
                "event {} has no state changes",
                self.id
            )));
        }
        let open = history.iter().filter(|c| c.is_current()).count();
        if open > 1 {
            return Err(ReviewError::InconsistentHistory(format!(
                "event {} has {open} open state changes",
                self.id
            )));
        }
        if open == 1 && history.last().is_some_and(|c| !c.is_current()) {
            return Err(ReviewError::InconsistentHistory(format!(
                "event {} has an open state change that is not the latest",
                self.id
            )));
        }
        self.history = history;
        Ok(self)
    }

    pub fn with_magnitude(mut self, magnitude: Magnitude) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_reach(mut self, reach: Reach) -> Self {
        self.reach = Some(reach);
        self
    }

    pub fn with_series(mut self, series: TimeSeries) -> Self {
        self.series.push(series);
        self
    }

    pub fn current_state(&self) -> ReviewState {
        self.latest_change().state
    }

    pub fn history(&self) -> &[StateChange] {
        &self.history
    }

    pub fn latest_change(&self) -> &StateChange {
        // Every constructor leaves at least one record behind.
        &self.history[self.history.len() - 1]
    }

    pub fn current_change(&self) -> Option<&StateChange> {
        self.history.iter().rev().find(|c| c.is_current())
    }

    pub fn reach_name(&self) -> Option<&str> {
        non_blank(self.reach.as_ref().map(|r| r.name.as_str()))
    }

    pub fn origin_name(&self) -> Option<&str> {
        non_blank(self.origin.as_ref().map(|o| o.name.as_str()))
    }

    pub fn classification_name(&self) -> Option<&str> {
        non_blank(self.classification.as_ref().map(|c| c.name.as_str()))
    }

    /// Closes the open record and appends `change` as the new current one.
    pub(crate) fn push_change(&mut self, change: StateChange) -> &StateChange {
        if let Some(open) = self.history.iter_mut().rev().find(|c| c.is_current()) {
            open.ended_at = Some(change.since);
        }
        self.history.push(change);
        self.latest_change()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "tests/event_tests.rs"]
mod tests;
