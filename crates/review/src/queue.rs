use shared::{domain::ReviewState, protocol::EventSummary};

use crate::event::SeismicEvent;

/// Events still waiting for an analyst, oldest occurrence first.
pub fn pending_reviews(events: Vec<SeismicEvent>) -> Vec<SeismicEvent> {
    let mut pending: Vec<_> = events
        .into_iter()
        .filter(|event| event.current_state() == ReviewState::AutoDetected)
        .collect();
    pending.sort_by_key(|event| (event.occurred_at, event.id));
    pending
}

pub fn summarize(event: &SeismicEvent) -> EventSummary {
    EventSummary {
        event_id: event.id,
        occurred_at: event.occurred_at,
        epicenter: event.epicenter.view(),
        hypocenter: event.hypocenter.view(),
        magnitude: event.magnitude.as_ref().map(|m| m.value),
        state: event.current_state(),
    }
}
