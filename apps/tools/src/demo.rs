//! Demo catalogue for `reviewctl seed`.
//!
//! Values are cycled from fixed tables so the same count always produces the
//! same events relative to `now`.

use chrono::{DateTime, Duration, Utc};
use review::{
    event::{
        Classification, Coordinates, DataType, Magnitude, Origin, Reach, Sample, SampleDetail,
        Seismograph, Station, TimeSeries,
    },
    SeismicEvent,
};
use shared::domain::{EventId, ReviewState};

const SERIES_PER_EVENT: usize = 4;

const STATES: [ReviewState; 5] = [
    ReviewState::AutoDetected,
    ReviewState::BlockedInReview,
    ReviewState::Rejected,
    ReviewState::PendingReview,
    ReviewState::Confirmed,
];

const CLASSIFICATIONS: [(f64, f64, &str); 3] = [
    (0.0, 70.0, "Shallow"),
    (70.0, 300.0, "Intermediate"),
    (300.0, 700.0, "Deep"),
];

const ORIGINS: [(&str, &str); 3] = [
    ("Tectonic", "Tectonic plate movement"),
    ("Volcanic", "Volcanic activity"),
    ("Collapse", "Collapse of underground cavities"),
];

const REACHES: [(&str, &str); 3] = [
    ("Local", "Felt only near the epicenter"),
    ("Regional", "Felt across several provinces"),
    ("Global", "Recorded by stations worldwide"),
];

const STATIONS: [(&str, &str); 3] = [
    ("N001", "North Station"),
    ("C001", "Center Station"),
    ("S001", "South Station"),
];

const DATA_TYPES: [(&str, &str); 3] = [
    ("wave velocity", "km/s"),
    ("wave frequency", "Hz"),
    ("wave length", "km/cycle"),
];

pub fn events(count: usize, now: DateTime<Utc>) -> Vec<SeismicEvent> {
    (0..count).map(|i| event(i, now)).collect()
}

fn event(i: usize, now: DateTime<Utc>) -> SeismicEvent {
    let n = i as i64;
    let state = STATES[i % STATES.len()];
    // Auto-detected events stay small so the pending queue looks plausible.
    let magnitude = if state == ReviewState::AutoDetected {
        round1(1.0 + (n * 7 % 30) as f64 / 10.0)
    } else {
        round1(1.0 + (n * 13 % 80) as f64 / 10.0)
    };
    let occurred_at = now - Duration::minutes(60 + (n * 137) % 1940);
    let ended_at = occurred_at + Duration::minutes(1 + (n * 53) % 60);

    let (depth_from_km, depth_to_km, class_name) = CLASSIFICATIONS[i % CLASSIFICATIONS.len()];
    let (origin_name, origin_description) = ORIGINS[(i / 2) % ORIGINS.len()];
    let (reach_name, reach_description) = REACHES[(i / 3) % REACHES.len()];

    let mut event = SeismicEvent::new(
        EventId(n + 1),
        occurred_at,
        ended_at,
        Coordinates::new(coordinate(n, 17, 90.0), coordinate(n, 29, 180.0)),
        Coordinates::new(coordinate(n, 23, 90.0), coordinate(n, 31, 180.0)),
        state,
        occurred_at,
    )
    .with_magnitude(Magnitude::richter(magnitude))
    .with_classification(Classification {
        depth_from_km,
        depth_to_km,
        name: class_name.into(),
    })
    .with_origin(Origin {
        name: origin_name.into(),
        description: origin_description.into(),
    })
    .with_reach(Reach {
        name: reach_name.into(),
        description: reach_description.into(),
    });

    for s in 0..SERIES_PER_EVENT {
        event = event.with_series(series(i, s, now));
    }
    event
}

fn series(event: usize, s: usize, now: DateTime<Utc>) -> TimeSeries {
    let window_start = now - Duration::minutes(30 * (s as i64 + 1));
    let (code, name) = STATIONS[(event + s) % STATIONS.len()];
    let sample_count = 5 + (event + s) % 4;

    TimeSeries {
        alarm_condition: format!("Alarm series #{}", s + 1),
        window_start,
        recorded_at: now - Duration::minutes(20 * (s as i64 + 1)),
        sampling_frequency_hz: 100.0 + s as f64 * 10.0,
        seismograph: Some(Seismograph {
            identifier: format!("SG-{}", 1000 + (event * 7 + s) % 9000),
            serial_number: format!("SN-{}", 10000 + (event * 31 + s * 3) % 90000),
            station: Station {
                code: code.into(),
                name: name.into(),
            },
        }),
        samples: (0..sample_count)
            .map(|j| Sample {
                taken_at: window_start + Duration::hours(j as i64),
                details: DATA_TYPES
                    .iter()
                    .enumerate()
                    .map(|(k, (denomination, unit))| SampleDetail {
                        value: ((event * 97 + s * 31 + j * 17 + k * 7) % 1000) as f64 / 100.0,
                        data_type: DataType {
                            denomination: (*denomination).into(),
                            unit: (*unit).into(),
                            threshold: 0.0,
                        },
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn coordinate(n: i64, step: i64, bound: f64) -> f64 {
    let span = (bound * 2.0) as i64 * 100;
    round4(((n * step * 997) % span) as f64 / 100.0 - bound)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 18, 0, 0).unwrap()
    }

    #[test]
    fn states_cycle_through_the_catalogue() {
        let states: Vec<_> = events(6, now()).iter().map(|e| e.current_state()).collect();
        assert_eq!(
            states,
            vec![
                ReviewState::AutoDetected,
                ReviewState::BlockedInReview,
                ReviewState::Rejected,
                ReviewState::PendingReview,
                ReviewState::Confirmed,
                ReviewState::AutoDetected,
            ]
        );
    }

    #[test]
    fn every_event_has_four_complete_series() {
        for event in events(5, now()) {
            assert_eq!(event.series.len(), SERIES_PER_EVENT);
            assert!(event.series.iter().all(|s| (5..=8).contains(&s.samples.len())));
            assert!(event.series.iter().all(|s| s.station_name().is_some()));
            assert!(event.reach_name().is_some() && event.origin_name().is_some());
            assert!(event.occurred_at < now());
        }
    }

    #[test]
    fn auto_detected_events_stay_below_magnitude_four() {
        for event in events(20, now()) {
            if event.current_state() == ReviewState::AutoDetected {
                let magnitude = event.magnitude.as_ref().map(|m| m.value).unwrap_or_default();
                assert!(magnitude < 4.0, "event {} has {magnitude}", event.id);
            }
        }
    }

    #[test]
    fn seeding_is_deterministic() {
        assert_eq!(events(7, now()), events(7, now()));
    }
}
