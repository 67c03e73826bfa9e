use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use review::{
    event::{
        Classification, Coordinates, DataType, Magnitude, Origin, Reach, Sample, SampleDetail,
        Seismograph, SeismicEvent, StateChange, Station, TimeSeries,
    },
    state_model, EventRepository,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, SqliteConnection,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info, warn};

use shared::domain::{Analyst, EventId, ReviewState};

const EVENT_COLUMNS: &str = "id, occurred_at, ended_at,
    epicenter_latitude, epicenter_longitude, hypocenter_latitude, hypocenter_longitude,
    magnitude_value, magnitude_description,
    classification_name, depth_from_km, depth_to_km,
    origin_name, origin_description, reach_name, reach_description,
    current_state";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every connection to an in-memory database opens a fresh one.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn count_events(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Stores a complete event: categories, time series with their samples,
    /// and its state history. The event keeps its own id.
    pub async fn insert_event(&self, event: &SeismicEvent) -> Result<EventId> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO events (
                id, occurred_at, ended_at,
                epicenter_latitude, epicenter_longitude, hypocenter_latitude, hypocenter_longitude,
                magnitude_value, magnitude_description,
                classification_name, depth_from_km, depth_to_km,
                origin_name, origin_description, reach_name, reach_description,
                current_state
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.0)
        .bind(event.occurred_at)
        .bind(event.ended_at)
        .bind(event.epicenter.latitude)
        .bind(event.epicenter.longitude)
        .bind(event.hypocenter.latitude)
        .bind(event.hypocenter.longitude)
        .bind(event.magnitude.as_ref().map(|m| m.value))
        .bind(event.magnitude.as_ref().map(|m| m.description.as_str()))
        .bind(event.classification.as_ref().map(|c| c.name.as_str()))
        .bind(event.classification.as_ref().map(|c| c.depth_from_km))
        .bind(event.classification.as_ref().map(|c| c.depth_to_km))
        .bind(event.origin.as_ref().map(|o| o.name.as_str()))
        .bind(event.origin.as_ref().map(|o| o.description.as_str()))
        .bind(event.reach.as_ref().map(|r| r.name.as_str()))
        .bind(event.reach.as_ref().map(|r| r.description.as_str()))
        .bind(event.current_state().as_str())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to insert event {}", event.id))?;

        for (position, series) in event.series.iter().enumerate() {
            insert_series(&mut tx, event.id, position, series).await?;
        }
        for change in event.history() {
            insert_state_change(&mut tx, event.id, change).await?;
        }

        tx.commit().await?;
        debug!(event_id = %event.id, series = event.series.len(), "event stored");
        Ok(event.id)
    }

    pub async fn load_event(&self, event_id: EventId) -> Result<Option<SeismicEvent>> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
            .bind(event_id.0)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    pub async fn state_history(&self, event_id: EventId) -> Result<Vec<StateChange>> {
        let rows = sqlx::query(
            "SELECT state, since, ended_at, responsible
             FROM state_changes
             WHERE event_id = ?
             ORDER BY id ASC",
        )
        .bind(event_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            let state = row
                .try_get::<String, _>("state")?
                .parse::<ReviewState>()
                .with_context(|| format!("bad state change for event {event_id}"))?;
            history.push(StateChange {
                since: row.try_get("since")?,
                state,
                responsible: row
                    .try_get::<Option<String>, _>("responsible")?
                    .and_then(Analyst::new),
                ended_at: row.try_get("ended_at")?,
            });
        }
        Ok(history)
    }

    async fn load_events(&self, state: Option<ReviewState>) -> Result<Vec<SeismicEvent>> {
        let rows = if let Some(state) = state {
            sqlx::query(&format!(
                "SELECT {EVENT_COLUMNS} FROM events
                 WHERE current_state = ?
                 ORDER BY occurred_at ASC, id ASC"
            ))
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {EVENT_COLUMNS} FROM events ORDER BY occurred_at ASC, id ASC"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            events.push(self.hydrate(&row).await?);
        }
        Ok(events)
    }

    async fn hydrate(&self, row: &SqliteRow) -> Result<SeismicEvent> {
        let event_id = EventId(row.try_get("id")?);
        let occurred_at: DateTime<Utc> = row.try_get("occurred_at")?;
        let history = self.state_history(event_id).await?;
        let mut event = SeismicEvent::new(
            event_id,
            occurred_at,
            row.try_get("ended_at")?,
            Coordinates::new(
                row.try_get("epicenter_latitude")?,
                row.try_get("epicenter_longitude")?,
            ),
            Coordinates::new(
                row.try_get("hypocenter_latitude")?,
                row.try_get("hypocenter_longitude")?,
            ),
            ReviewState::AutoDetected,
            occurred_at,
        )
        .with_history(history)?;

        let stored_state = row
            .try_get::<String, _>("current_state")?
            .parse::<ReviewState>()?;
        if stored_state != event.current_state() {
            bail!(
                "event {event_id} is marked {stored_state} but its history ends in {}",
                event.current_state()
            );
        }

        if let Some(value) = row.try_get::<Option<f64>, _>("magnitude_value")? {
            event.magnitude = Some(Magnitude {
                value,
                description: row
                    .try_get::<Option<String>, _>("magnitude_description")?
                    .unwrap_or_default(),
            });
        }
        if let Some(name) = row.try_get::<Option<String>, _>("classification_name")? {
            event.classification = Some(Classification {
                depth_from_km: row
                    .try_get::<Option<f64>, _>("depth_from_km")?
                    .unwrap_or_default(),
                depth_to_km: row
                    .try_get::<Option<f64>, _>("depth_to_km")?
                    .unwrap_or_default(),
                name,
            });
        }
        if let Some(name) = row.try_get::<Option<String>, _>("origin_name")? {
            event.origin = Some(Origin {
                name,
                description: row
                    .try_get::<Option<String>, _>("origin_description")?
                    .unwrap_or_default(),
            });
        }
        if let Some(name) = row.try_get::<Option<String>, _>("reach_name")? {
            event.reach = Some(Reach {
                name,
                description: row
                    .try_get::<Option<String>, _>("reach_description")?
                    .unwrap_or_default(),
            });
        }
        event.series = self.load_series(event_id).await?;
        Ok(event)
    }

    async fn load_series(&self, event_id: EventId) -> Result<Vec<TimeSeries>> {
        let rows = sqlx::query(
            "SELECT ts.id, ts.alarm_condition, ts.window_start, ts.recorded_at,
                    ts.sampling_frequency_hz, ts.seismograph_id, ts.serial_number,
                    ts.station_code, st.name AS station_name
             FROM time_series ts
             LEFT JOIN stations st ON st.code = ts.station_code
             WHERE ts.event_id = ?
             ORDER BY ts.position ASC",
        )
        .bind(event_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut series = Vec::with_capacity(rows.len());
        for row in rows {
            let series_id: i64 = row.try_get("id")?;
            let seismograph = match (
                row.try_get::<Option<String>, _>("seismograph_id")?,
                row.try_get::<Option<String>, _>("station_code")?,
            ) {
                (Some(identifier), Some(code)) => Some(Seismograph {
                    identifier,
                    serial_number: row
                        .try_get::<Option<String>, _>("serial_number")?
                        .unwrap_or_default(),
                    station: Station {
                        name: row
                            .try_get::<Option<String>, _>("station_name")?
                            .unwrap_or_else(|| code.clone()),
                        code,
                    },
                }),
                _ => None,
            };
            series.push(TimeSeries {
                alarm_condition: row.try_get("alarm_condition")?,
                window_start: row.try_get("window_start")?,
                recorded_at: row.try_get("recorded_at")?,
                sampling_frequency_hz: row.try_get("sampling_frequency_hz")?,
                seismograph,
                samples: self.load_samples(series_id).await?,
            });
        }
        Ok(series)
    }

    async fn load_samples(&self, series_id: i64) -> Result<Vec<Sample>> {
        let rows = sqlx::query(
            "SELECT s.id, s.taken_at, d.value, d.denomination, d.unit, d.threshold
             FROM samples s
             LEFT JOIN sample_details d ON d.sample_id = s.id
             WHERE s.series_id = ?
             ORDER BY s.id ASC, d.id ASC",
        )
        .bind(series_id)
        .fetch_all(&self.pool)
        .await?;

        let mut samples: Vec<(i64, Sample)> = Vec::new();
        for row in rows {
            let sample_id: i64 = row.try_get("id")?;
            if samples.last().map(|(id, _)| *id) != Some(sample_id) {
                samples.push((
                    sample_id,
                    Sample {
                        taken_at: row.try_get("taken_at")?,
                        details: Vec::new(),
                    },
                ));
            }
            let Some(value) = row.try_get::<Option<f64>, _>("value")? else {
                continue;
            };
            let detail = SampleDetail {
                value,
                data_type: DataType {
                    denomination: row
                        .try_get::<Option<String>, _>("denomination")?
                        .unwrap_or_default(),
                    unit: row.try_get::<Option<String>, _>("unit")?.unwrap_or_default(),
                    threshold: row
                        .try_get::<Option<f64>, _>("threshold")?
                        .unwrap_or_default(),
                },
            };
            if let Some((_, sample)) = samples.last_mut() {
                sample.details.push(detail);
            }
        }
        Ok(samples.into_iter().map(|(_, sample)| sample).collect())
    }
}

async fn insert_series(
    conn: &mut SqliteConnection,
    event_id: EventId,
    position: usize,
    series: &TimeSeries,
) -> Result<()> {
    if let Some(seismograph) = &series.seismograph {
        sqlx::query(
            "INSERT INTO stations (code, name) VALUES (?, ?)
             ON CONFLICT(code) DO UPDATE SET name = excluded.name",
        )
        .bind(&seismograph.station.code)
        .bind(&seismograph.station.name)
        .execute(&mut *conn)
        .await?;
    }

    let rec = sqlx::query(
        "INSERT INTO time_series (
            event_id, position, alarm_condition, window_start, recorded_at,
            sampling_frequency_hz, seismograph_id, serial_number, station_code
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(event_id.0)
    .bind(i64::try_from(position).unwrap_or(i64::MAX))
    .bind(&series.alarm_condition)
    .bind(series.window_start)
    .bind(series.recorded_at)
    .bind(series.sampling_frequency_hz)
    .bind(series.seismograph.as_ref().map(|s| s.identifier.as_str()))
    .bind(series.seismograph.as_ref().map(|s| s.serial_number.as_str()))
    .bind(series.seismograph.as_ref().map(|s| s.station.code.as_str()))
    .fetch_one(&mut *conn)
    .await?;
    let series_id: i64 = rec.try_get(0)?;

    for sample in &series.samples {
        let rec = sqlx::query("INSERT INTO samples (series_id, taken_at) VALUES (?, ?) RETURNING id")
            .bind(series_id)
            .bind(sample.taken_at)
            .fetch_one(&mut *conn)
            .await?;
        let sample_id: i64 = rec.try_get(0)?;

        for detail in &sample.details {
            sqlx::query(
                "INSERT INTO sample_details (sample_id, value, denomination, unit, threshold)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(sample_id)
            .bind(detail.value)
            .bind(&detail.data_type.denomination)
            .bind(&detail.data_type.unit)
            .bind(detail.data_type.threshold)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

async fn insert_state_change(
    conn: &mut SqliteConnection,
    event_id: EventId,
    change: &StateChange,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO state_changes (event_id, state, since, ended_at, responsible)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(event_id.0)
    .bind(change.state.as_str())
    .bind(change.since)
    .bind(change.ended_at)
    .bind(change.responsible.as_ref().map(Analyst::as_str))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl EventRepository for Storage {
    async fn load_all_events(&self) -> Result<Vec<SeismicEvent>> {
        self.load_events(None).await
    }

    async fn load_auto_detected_events(&self) -> Result<Vec<SeismicEvent>> {
        self.load_events(Some(ReviewState::AutoDetected)).await
    }

    async fn append_state_change(&self, event_id: EventId, record: &StateChange) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let stored: Option<String> =
            sqlx::query_scalar("SELECT current_state FROM events WHERE id = ?")
                .bind(event_id.0)
                .fetch_optional(&mut *tx)
                .await?;
        let stored = stored
            .ok_or_else(|| anyhow!("event {event_id} not found"))?
            .parse::<ReviewState>()?;
        if !state_model::can_enter(stored, record.state) {
            warn!(%event_id, %stored, requested = %record.state, "stale state change refused");
            bail!(
                "event {event_id} is {stored}; refusing stale change to {}",
                record.state
            );
        }

        let closed = sqlx::query(
            "UPDATE state_changes SET ended_at = ? WHERE event_id = ? AND ended_at IS NULL",
        )
        .bind(record.since)
        .bind(event_id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if closed != 1 {
            bail!("event {event_id} had {closed} open state changes, expected exactly one");
        }

        insert_state_change(&mut tx, event_id, &StateChange { ended_at: None, ..record.clone() })
            .await?;
        sqlx::query("UPDATE events SET current_state = ? WHERE id = ?")
            .bind(record.state.as_str())
            .bind(event_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(%event_id, from = %stored, to = %record.state, "state change stored");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
