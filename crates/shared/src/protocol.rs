use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Analyst, EventId, ReviewState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinatesView {
    pub latitude: f64,
    pub longitude: f64,
}

/// One row of the review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub epicenter: CoordinatesView,
    pub hypocenter: CoordinatesView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    pub state: ReviewState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangeView {
    pub state: ReviewState,
    pub since: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<Analyst>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetail {
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub epicenter: CoordinatesView,
    pub hypocenter: CoordinatesView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reach: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub state: ReviewState,
    pub history: Vec<StateChangeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRow {
    pub taken_at: DateTime<Utc>,
    pub denomination: String,
    pub value: f64,
    pub unit: String,
}

/// Samples of one time series, labelled with the station that recorded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSamples {
    pub station: String,
    pub alarm_condition: String,
    pub sampling_frequency_hz: f64,
    pub rows: Vec<SampleRow>,
}

/// What the caller shows after a successful operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub event_id: EventId,
    pub state: ReviewState,
    pub since: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<Analyst>,
    pub changed: bool,
}
