use chrono::{DateTime, Duration, TimeZone, Utc};
use shared::domain::{Analyst, EventId, ReviewState};

use crate::event::{
    Classification, Coordinates, DataType, Magnitude, Origin, Reach, Sample, SampleDetail,
    Seismograph, SeismicEvent, Station, TimeSeries,
};

pub fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
}

pub fn analyst(name: &str) -> Analyst {
    Analyst::new(name).expect("non-empty analyst")
}

pub fn bare_event(id: i64, state: ReviewState) -> SeismicEvent {
    SeismicEvent::new(
        EventId(id),
        at(-30),
        at(-25),
        Coordinates::new(-31.42, -64.18),
        Coordinates::new(-31.45, -64.2),
        state,
        at(0),
    )
}

pub fn series(station: &str, samples: usize) -> TimeSeries {
    let velocity = DataType {
        denomination: "wave velocity".into(),
        unit: "km/s".into(),
        threshold: 0.0,
    };
    TimeSeries {
        alarm_condition: format!("alarm at {station}"),
        window_start: at(-30),
        recorded_at: at(-20),
        sampling_frequency_hz: 100.0,
        seismograph: Some(Seismograph {
            identifier: format!("SG-{station}"),
            serial_number: "NS-10001".into(),
            station: Station {
                code: station.chars().take(3).collect(),
                name: station.to_string(),
            },
        }),
        samples: (0..samples)
            .map(|i| Sample {
                taken_at: at(-30 + i as i64),
                details: vec![SampleDetail {
                    value: 1.5 + i as f64,
                    data_type: velocity.clone(),
                }],
            })
            .collect(),
    }
}

/// An event carrying every piece of data a disposition needs.
pub fn complete_event(id: i64, state: ReviewState) -> SeismicEvent {
    bare_event(id, state)
        .with_magnitude(Magnitude::richter(4.2))
        .with_reach(Reach {
            name: "Regional".into(),
            description: "felt across several provinces".into(),
        })
        .with_origin(Origin {
            name: "Tectonic".into(),
            description: "plate movement".into(),
        })
        .with_classification(Classification {
            depth_from_km: 0.0,
            depth_to_km: 70.0,
            name: "Shallow".into(),
        })
        .with_series(series("South Station", 3))
        .with_series(series("North Station", 2))
}
