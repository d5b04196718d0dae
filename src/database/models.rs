// src/database/models.rs
use chrono::{DateTime, Utc};

use crate::models::{CachedState, HistoryEntry, VesselObservation};

/// Observation columns shared by `vessel_cache` and `vessel_history`
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ObservationRow {
    mmsi: String,
    imo: Option<i64>,
    name: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    length: Option<f64>,
    width: Option<f64>,
    draft: Option<f64>,
    cog: Option<f64>,
    heading: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    weather: Option<String>,
    weatherdescription: Option<String>,
    temperature: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<f64>,
    windspeed: Option<f64>,
    rain: Option<String>,
    clouds: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CacheRow {
    #[sqlx(flatten)]
    observation: ObservationRow,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HistoryRow {
    id: i64,
    #[sqlx(flatten)]
    observation: ObservationRow,
    message: String,
    created_at: DateTime<Utc>,
}

impl From<ObservationRow> for VesselObservation {
    fn from(row: ObservationRow) -> Self {
        VesselObservation {
            mmsi: row.mmsi,
            imo: row.imo,
            name: row.name,
            timestamp: row.timestamp,
            length: row.length,
            width: row.width,
            draft: row.draft,
            cog: row.cog,
            heading: row.heading,
            latitude: row.latitude,
            longitude: row.longitude,
            weather: row.weather,
            weather_description: row.weatherdescription,
            temperature: row.temperature,
            pressure: row.pressure,
            humidity: row.humidity,
            windspeed: row.windspeed,
            rain: row.rain,
            clouds: row.clouds,
        }
    }
}

impl From<CacheRow> for CachedState {
    fn from(row: CacheRow) -> Self {
        CachedState {
            observation: row.observation.into(),
            cached_at: row.cached_at,
        }
    }
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        HistoryEntry {
            id: row.id,
            observation: row.observation.into(),
            message: row.message,
            created_at: row.created_at,
        }
    }
}
