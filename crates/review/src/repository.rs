//! Persistence seam for the review workflow.
//!
//! The workflow never opens connections or manages a schema. It receives
//! fully built events from an [`EventRepository`] and hands back the state
//! changes it appended, which the caller persists through the same trait.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use shared::domain::{EventId, ReviewState};
use tokio::sync::RwLock;

use crate::{
    event::{SeismicEvent, StateChange},
    state_model,
};

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn load_all_events(&self) -> Result<Vec<SeismicEvent>>;

    async fn load_auto_detected_events(&self) -> Result<Vec<SeismicEvent>>;

    /// Closes the event's open state change and stores `record` as the new
    /// open one. Refused when `record.state` cannot follow the stored current
    /// state, which is how a concurrent session's stale write is detected.
    async fn append_state_change(&self, event_id: EventId, record: &StateChange) -> Result<()>;
}

/// Repository that keeps events in memory. State is lost on drop.
pub struct InMemoryRepository {
    events: RwLock<BTreeMap<EventId, SeismicEvent>>,
}

impl InMemoryRepository {
    pub fn with_events(events: impl IntoIterator<Item = SeismicEvent>) -> Self {
        Self {
            events: RwLock::new(events.into_iter().map(|e| (e.id, e)).collect()),
        }
    }

    pub async fn get(&self, event_id: EventId) -> Option<SeismicEvent> {
        self.events.read().await.get(&event_id).cloned()
    }
}

#[async_trait]
impl EventRepository for InMemoryRepository {
    async fn load_all_events(&self) -> Result<Vec<SeismicEvent>> {
        Ok(self.events.read().await.values().cloned().collect())
    }

    async fn load_auto_detected_events(&self) -> Result<Vec<SeismicEvent>> {
        Ok(self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.current_state() == ReviewState::AutoDetected)
            .cloned()
            .collect())
    }

    async fn append_state_change(&self, event_id: EventId, record: &StateChange) -> Result<()> {
        let mut events = self.events.write().await;
        let event = events
            .get_mut(&event_id)
            .ok_or_else(|| anyhow!("event {event_id} not found"))?;
        let stored = event.current_state();
        if !state_model::can_enter(stored, record.state) {
            bail!(
                "event {event_id} is {stored}; refusing stale change to {}",
                record.state
            );
        }
        event.push_change(record.clone());
        Ok(())
    }
}
