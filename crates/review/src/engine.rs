//! One analyst's review session over a single seismic event.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use shared::{
    domain::{ActionTarget, Analyst, EventId, ReviewOperation, ReviewState},
    error::{MissingData, ReviewError},
    protocol::{EventDetail, ReviewOutcome, SampleRow, StationSamples},
};
use tracing::{debug, info, warn};

use crate::{
    event::{SeismicEvent, StateChange},
    state_model,
};

const UNKNOWN_STATION: &str = "unknown station";

/// What a transition did to the selected event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub event_id: EventId,
    pub state: ReviewState,
    /// The record appended by the transition, `None` for a no-op.
    pub appended: Option<StateChange>,
}

impl TransitionOutcome {
    pub fn view(&self, event: &SeismicEvent) -> ReviewOutcome {
        let latest = event.latest_change();
        ReviewOutcome {
            event_id: self.event_id,
            state: self.state,
            since: latest.since,
            responsible: latest.responsible.clone(),
            changed: self.appended.is_some(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ReviewSession {
    selected: Option<SeismicEvent>,
    targets: BTreeSet<ActionTarget>,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `event` the active event and locks it for review.
    ///
    /// A previously selected event is dropped along with any chosen targets.
    /// If locking fails the event stays selected, unchanged, and the error is
    /// returned.
    pub fn select_event(
        &mut self,
        event: SeismicEvent,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ReviewError> {
        debug!(event_id = %event.id, state = %event.current_state(), "selecting event");
        self.targets.clear();
        self.selected = Some(event);
        self.review(now)
    }

    pub fn selected(&self) -> Option<&SeismicEvent> {
        self.selected.as_ref()
    }

    pub fn review(&mut self, now: DateTime<Utc>) -> Result<TransitionOutcome, ReviewError> {
        self.run(ReviewOperation::Review, now, None)
    }

    pub fn confirm(
        &mut self,
        now: DateTime<Utc>,
        actor: &Analyst,
    ) -> Result<TransitionOutcome, ReviewError> {
        self.run(ReviewOperation::Confirm, now, Some(actor))
    }

    pub fn derive(
        &mut self,
        now: DateTime<Utc>,
        actor: &Analyst,
    ) -> Result<TransitionOutcome, ReviewError> {
        self.run(ReviewOperation::Derive, now, Some(actor))
    }

    pub fn reject(
        &mut self,
        now: DateTime<Utc>,
        actor: &Analyst,
    ) -> Result<TransitionOutcome, ReviewError> {
        let event = self.selected.as_ref().ok_or(ReviewError::NoEventSelected)?;
        let state = event.current_state();
        // Finished events report their state before any missing data.
        if state.is_terminal() {
            let err = ReviewError::TerminalState {
                state,
                operation: ReviewOperation::Reject,
            };
            warn!(event_id = %event.id, %state, error = %err, "transition refused");
            return Err(err);
        }
        self.validate_preconditions()?;
        self.run(ReviewOperation::Reject, now, Some(actor))
    }

    /// Marks one of the event's categories as the subject of the next
    /// disposition and returns the category's name, if the event has one.
    pub fn choose_target(&mut self, target: ActionTarget) -> Result<Option<String>, ReviewError> {
        let event = self.selected.as_ref().ok_or(ReviewError::NoEventSelected)?;
        let name = match target {
            ActionTarget::Reach => event.reach_name(),
            ActionTarget::Classification => event.classification_name(),
            ActionTarget::Origin => event.origin_name(),
        }
        .map(str::to_string);
        self.targets.insert(target);
        Ok(name)
    }

    pub fn chosen_targets(&self) -> impl Iterator<Item = ActionTarget> + '_ {
        self.targets.iter().copied()
    }

    /// Data-completeness gate run before a rejection. Checks run in a fixed
    /// order and the first failure is reported.
    pub fn validate_preconditions(&self) -> Result<(), ReviewError> {
        let event = self.selected.as_ref().ok_or(ReviewError::NoEventSelected)?;

        let missing = if event.magnitude.is_none() {
            Some(MissingData::Magnitude)
        } else if event.reach_name().is_none() {
            Some(MissingData::Reach)
        } else if event.origin_name().is_none() {
            Some(MissingData::Origin)
        } else if self.targets.is_empty() {
            Some(MissingData::ActionTarget)
        } else if event.series.is_empty() {
            Some(MissingData::TimeSeries)
        } else {
            event
                .series
                .iter()
                .position(|series| series.samples.is_empty())
                .map(|index| MissingData::Samples { index: index + 1 })
        };

        match missing {
            Some(missing) => {
                warn!(event_id = %event.id, %missing, "event data incomplete");
                Err(ReviewError::IncompleteEventData(missing))
            }
            None => Ok(()),
        }
    }

    pub fn detail(&self) -> Result<EventDetail, ReviewError> {
        let event = self.selected.as_ref().ok_or(ReviewError::NoEventSelected)?;
        Ok(detail(event))
    }

    /// Sample tables of the selected event, one per time series, ordered by
    /// station name.
    pub fn station_samples(&self) -> Result<Vec<StationSamples>, ReviewError> {
        let event = self.selected.as_ref().ok_or(ReviewError::NoEventSelected)?;
        Ok(station_samples(event))
    }

    fn run(
        &mut self,
        operation: ReviewOperation,
        now: DateTime<Utc>,
        actor: Option<&Analyst>,
    ) -> Result<TransitionOutcome, ReviewError> {
        let event = self.selected.as_mut().ok_or(ReviewError::NoEventSelected)?;
        let from = event.current_state();
        let appended = state_model::apply(event, operation, now, actor).inspect_err(|err| {
            warn!(event_id = %event.id, %operation, state = %from, error = %err, "transition refused");
        })?;

        let state = event.current_state();
        if appended.is_some() {
            info!(
                event_id = %event.id,
                %operation,
                from = %from,
                to = %state,
                responsible = actor.map(Analyst::as_str).unwrap_or("system"),
                "event state changed"
            );
        } else {
            debug!(event_id = %event.id, %operation, state = %state, "transition was a no-op");
        }

        Ok(TransitionOutcome {
            event_id: event.id,
            state,
            appended,
        })
    }
}

pub fn detail(event: &SeismicEvent) -> EventDetail {
    EventDetail {
        event_id: event.id,
        occurred_at: event.occurred_at,
        ended_at: event.ended_at,
        epicenter: event.epicenter.view(),
        hypocenter: event.hypocenter.view(),
        magnitude: event.magnitude.as_ref().map(|m| m.value),
        magnitude_description: event.magnitude.as_ref().map(|m| m.description.clone()),
        reach: event.reach_name().map(str::to_string),
        classification: event.classification_name().map(str::to_string),
        origin: event.origin_name().map(str::to_string),
        state: event.current_state(),
        history: event.history().iter().map(StateChange::view).collect(),
    }
}

pub fn station_samples(event: &SeismicEvent) -> Vec<StationSamples> {
    let mut tables: Vec<StationSamples> = event
        .series
        .iter()
        .map(|series| StationSamples {
            station: series.station_name().unwrap_or(UNKNOWN_STATION).to_string(),
            alarm_condition: series.alarm_condition.clone(),
            sampling_frequency_hz: series.sampling_frequency_hz,
            rows: series
                .samples
                .iter()
                .flat_map(|sample| {
                    sample.details.iter().map(move |detail| SampleRow {
                        taken_at: sample.taken_at,
                        denomination: detail.data_type.denomination.clone(),
                        value: detail.value,
                        unit: detail.data_type.unit.clone(),
                    })
                })
                .collect(),
        })
        .collect();
    tables.sort_by(|a, b| a.station.cmp(&b.station));
    tables
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
