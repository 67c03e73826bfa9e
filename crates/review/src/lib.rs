//! Review workflow for auto-detected seismic events.
//!
//! [`state_model`] holds the transition table, [`engine::ReviewSession`]
//! drives one analyst's session over a selected event, and
//! [`repository::EventRepository`] is the seam to whatever stores events.

pub mod engine;
pub mod event;
pub mod queue;
pub mod repository;
pub mod state_model;

#[cfg(test)]
mod test_support;

pub use engine::{ReviewSession, TransitionOutcome};
pub use event::SeismicEvent;
pub use repository::{EventRepository, InMemoryRepository};
