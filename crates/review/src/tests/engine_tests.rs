use super::*;
use crate::test_support::{analyst, at, bare_event, complete_event, series};

fn locked_session(event: SeismicEvent) -> ReviewSession {
    let mut session = ReviewSession::new();
    session.select_event(event, at(1)).expect("select");
    session
}

#[test]
fn selecting_an_auto_detected_event_locks_it() {
    let mut session = ReviewSession::new();
    let outcome = session
        .select_event(bare_event(1, ReviewState::AutoDetected), at(0))
        .expect("select");

    assert_eq!(outcome.state, ReviewState::BlockedInReview);
    let appended = outcome.appended.expect("lock record");
    assert!(appended.responsible.is_none());

    let event = session.selected().expect("selected");
    assert_eq!(event.history().len(), 2);
    assert_eq!(event.history()[0].state, ReviewState::AutoDetected);
    assert_eq!(event.history()[0].ended_at, Some(at(0)));
    assert!(event.history()[1].is_current());
}

#[test]
fn confirm_scenario_records_the_analyst_and_closes_the_lock() {
    let mut session = ReviewSession::new();
    session
        .select_event(complete_event(1, ReviewState::AutoDetected), at(0))
        .expect("select");
    let outcome = session.confirm(at(10), &analyst("analyst1")).expect("confirm");

    assert_eq!(outcome.state, ReviewState::Confirmed);
    let event = session.selected().expect("selected");
    assert_eq!(event.history().len(), 3);
    assert_eq!(
        event.latest_change().responsible,
        Some(analyst("analyst1"))
    );
    assert_eq!(event.history()[1].state, ReviewState::BlockedInReview);
    assert_eq!(event.history()[1].ended_at, Some(at(10)));
}

#[test]
fn selecting_an_already_locked_event_adds_no_record() {
    let mut session = ReviewSession::new();
    let outcome = session
        .select_event(bare_event(1, ReviewState::BlockedInReview), at(0))
        .expect("select");
    assert!(outcome.appended.is_none());
    assert_eq!(session.selected().map(|e| e.history().len()), Some(1));
}

#[test]
fn selecting_a_terminal_event_fails_but_keeps_it_for_inspection() {
    let mut session = ReviewSession::new();
    let err = session
        .select_event(bare_event(1, ReviewState::Rejected), at(0))
        .expect_err("terminal");
    assert!(matches!(err, ReviewError::TerminalState { .. }));
    assert_eq!(
        session.selected().map(|e| e.current_state()),
        Some(ReviewState::Rejected)
    );
}

#[test]
fn confirming_a_rejected_event_has_no_side_effects() {
    let mut session = ReviewSession::new();
    let _ = session.select_event(complete_event(7, ReviewState::Rejected), at(0));
    let before = session.selected().cloned().expect("selected");

    let err = session.confirm(at(3), &analyst("analyst3")).expect_err("terminal");

    assert_eq!(
        err,
        ReviewError::TerminalState {
            state: ReviewState::Rejected,
            operation: ReviewOperation::Confirm,
        }
    );
    assert_eq!(session.selected(), Some(&before));
}

#[test]
fn operations_without_a_selected_event_fail() {
    let mut session = ReviewSession::new();
    let actor = analyst("analyst1");
    assert_eq!(session.review(at(0)), Err(ReviewError::NoEventSelected));
    assert_eq!(session.confirm(at(0), &actor), Err(ReviewError::NoEventSelected));
    assert_eq!(session.derive(at(0), &actor), Err(ReviewError::NoEventSelected));
    assert_eq!(session.reject(at(0), &actor), Err(ReviewError::NoEventSelected));
    assert_eq!(
        session.choose_target(ActionTarget::Reach),
        Err(ReviewError::NoEventSelected)
    );
    assert!(session.detail().is_err());
}

#[test]
fn reject_without_time_series_fails_and_appends_nothing() {
    let mut event = complete_event(3, ReviewState::BlockedInReview);
    event.series.clear();
    let mut session = locked_session(event);
    session.choose_target(ActionTarget::Reach).expect("target");

    let err = session.reject(at(2), &analyst("analyst2")).expect_err("incomplete");

    assert_eq!(
        err,
        ReviewError::IncompleteEventData(MissingData::TimeSeries)
    );
    let event = session.selected().expect("selected");
    assert_eq!(event.current_state(), ReviewState::BlockedInReview);
    assert_eq!(event.history().len(), 1);
}

#[test]
fn reject_without_magnitude_fails_before_anything_else() {
    let mut event = bare_event(3, ReviewState::BlockedInReview);
    event.series.push(series("Center Station", 0));
    let mut session = locked_session(event);

    let err = session.reject(at(2), &analyst("analyst2")).expect_err("incomplete");
    assert_eq!(err, ReviewError::IncompleteEventData(MissingData::Magnitude));
    assert_eq!(session.selected().map(|e| e.history().len()), Some(1));
}

#[test]
fn precondition_checks_run_in_order() {
    let session = locked_session(complete_event(5, ReviewState::BlockedInReview));
    assert_eq!(
        session.validate_preconditions(),
        Err(ReviewError::IncompleteEventData(MissingData::ActionTarget))
    );

    let mut event = complete_event(5, ReviewState::BlockedInReview);
    event.reach = None;
    event.origin = None;
    let session = locked_session(event);
    assert_eq!(
        session.validate_preconditions(),
        Err(ReviewError::IncompleteEventData(MissingData::Reach))
    );

    let mut event = complete_event(5, ReviewState::BlockedInReview);
    event.origin = None;
    let session = locked_session(event);
    assert_eq!(
        session.validate_preconditions(),
        Err(ReviewError::IncompleteEventData(MissingData::Origin))
    );

    let mut event = complete_event(5, ReviewState::BlockedInReview);
    event.series.push(series("East Station", 0));
    let mut session = locked_session(event);
    session.choose_target(ActionTarget::Origin).expect("target");
    assert_eq!(
        session.validate_preconditions(),
        Err(ReviewError::IncompleteEventData(MissingData::Samples { index: 3 }))
    );
}

#[test]
fn reject_with_complete_data_records_the_analyst() {
    let mut session = ReviewSession::new();
    session
        .select_event(complete_event(8, ReviewState::PendingReview), at(0))
        .expect("select");
    let name = session
        .choose_target(ActionTarget::Classification)
        .expect("target");
    assert_eq!(name.as_deref(), Some("Shallow"));

    let outcome = session.reject(at(4), &analyst("analyst2")).expect("reject");

    assert_eq!(outcome.state, ReviewState::Rejected);
    let appended = outcome.appended.expect("record");
    assert_eq!(appended.responsible, Some(analyst("analyst2")));
    assert_eq!(appended.since, at(4));
}

#[test]
fn confirm_and_derive_skip_the_data_gate() {
    let mut session = locked_session(bare_event(2, ReviewState::AutoDetected));
    let outcome = session.derive(at(5), &analyst("expert")).expect("derive");
    assert_eq!(outcome.state, ReviewState::Derived);
}

#[test]
fn selecting_another_event_clears_chosen_targets() {
    let mut session = locked_session(complete_event(1, ReviewState::AutoDetected));
    session.choose_target(ActionTarget::Reach).expect("target");
    assert_eq!(session.chosen_targets().count(), 1);

    session
        .select_event(complete_event(2, ReviewState::AutoDetected), at(3))
        .expect("select");
    assert_eq!(session.chosen_targets().count(), 0);
    assert_eq!(session.selected().map(|e| e.id), Some(EventId(2)));
}

#[test]
fn station_samples_are_sorted_by_station_name() {
    let session = locked_session(complete_event(1, ReviewState::AutoDetected));
    let tables = session.station_samples().expect("samples");
    let stations: Vec<_> = tables.iter().map(|t| t.station.as_str()).collect();
    assert_eq!(stations, vec!["North Station", "South Station"]);
    assert_eq!(tables[0].rows.len(), 2);
    assert_eq!(tables[1].rows[0].unit, "km/s");
}

#[test]
fn detail_reports_categories_and_history() {
    let session = locked_session(complete_event(1, ReviewState::AutoDetected));
    let detail = session.detail().expect("detail");
    assert_eq!(detail.state, ReviewState::BlockedInReview);
    assert_eq!(detail.reach.as_deref(), Some("Regional"));
    assert_eq!(detail.origin.as_deref(), Some("Tectonic"));
    assert_eq!(detail.magnitude_description.as_deref(), Some("moderate"));
    assert_eq!(detail.history.len(), 2);
}

#[test]
fn outcome_view_reports_the_latest_record() {
    let mut session = locked_session(complete_event(1, ReviewState::AutoDetected));
    let outcome = session.confirm(at(9), &analyst("analyst1")).expect("confirm");
    let view = outcome.view(session.selected().expect("selected"));
    assert!(view.changed);
    assert_eq!(view.since, at(9));
    assert_eq!(view.responsible, Some(analyst("analyst1")));
}

#[test]
fn review_and_reject_refuse_every_terminal_event() {
    for terminal in [
        ReviewState::Confirmed,
        ReviewState::Rejected,
        ReviewState::Derived,
    ] {
        for event in [bare_event(1, terminal), complete_event(2, terminal)] {
            let mut session = ReviewSession::new();
            let _ = session.select_event(event, at(0));
            let before = session.selected().cloned().expect("selected");

            assert_eq!(
                session.review(at(1)),
                Err(ReviewError::TerminalState {
                    state: terminal,
                    operation: ReviewOperation::Review,
                })
            );
            assert_eq!(
                session.reject(at(2), &analyst("analyst2")),
                Err(ReviewError::TerminalState {
                    state: terminal,
                    operation: ReviewOperation::Reject,
                })
            );
            assert_eq!(session.selected(), Some(&before));
        }
    }
}

#[test]
fn terminal_state_wins_over_chosen_targets_and_complete_data() {
    let mut session = ReviewSession::new();
    let _ = session.select_event(complete_event(4, ReviewState::Confirmed), at(0));
    session.choose_target(ActionTarget::Origin).expect("target");

    let err = session.reject(at(1), &analyst("analyst1")).expect_err("terminal");
    assert_eq!(err.code(), shared::error::ErrorCode::TerminalState);
    assert_eq!(session.selected().map(|e| e.history().len()), Some(1));
}

#[test]
fn chosen_targets_are_listed_in_category_order() {
    let mut session = locked_session(complete_event(1, ReviewState::AutoDetected));
    session.choose_target(ActionTarget::Origin).expect("origin");
    session.choose_target(ActionTarget::Reach).expect("reach");
    session.choose_target(ActionTarget::Origin).expect("origin again");
    assert_eq!(
        session.chosen_targets().collect::<Vec<_>>(),
        vec![ActionTarget::Reach, ActionTarget::Origin]
    );
}
