// src/database.rs
//! PostgreSQL storage backend
//!
//! Tables `vessel_cache` and `vessel_history` are created by the migrations
//! in `migrations/`. Storage timestamps are computed from the injected
//! [`Clock`] and bound explicitly, never left to column defaults.

mod models;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use sqlx::{
    postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions},
    query::QueryAs,
    Postgres,
};
use tracing::{debug, info};

use crate::{
    clock::Clock,
    config::DatabaseConfig,
    errors::VesselStoreError,
    models::{CachedState, HistoryEntry, HistoryQuery, Mmsi, SortOrder, VesselObservation},
    store::{expiry_cutoff, ExpirySweep, HistoryLog, StateStore},
};
use self::models::{CacheRow, HistoryRow};

const UPSERT_CACHE: &str = r#"
INSERT INTO vessel_cache (
    mmsi, imo, name, "timestamp", length, width, draft, cog, heading,
    latitude, longitude, weather, weatherdescription, temperature,
    pressure, humidity, windspeed, rain, clouds, cached_at
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
)
ON CONFLICT (mmsi) DO UPDATE SET
    imo = EXCLUDED.imo,
    name = EXCLUDED.name,
    "timestamp" = EXCLUDED."timestamp",
    length = EXCLUDED.length,
    width = EXCLUDED.width,
    draft = EXCLUDED.draft,
    cog = EXCLUDED.cog,
    heading = EXCLUDED.heading,
    latitude = EXCLUDED.latitude,
    longitude = EXCLUDED.longitude,
    weather = EXCLUDED.weather,
    weatherdescription = EXCLUDED.weatherdescription,
    temperature = EXCLUDED.temperature,
    pressure = EXCLUDED.pressure,
    humidity = EXCLUDED.humidity,
    windspeed = EXCLUDED.windspeed,
    rain = EXCLUDED.rain,
    clouds = EXCLUDED.clouds,
    cached_at = EXCLUDED.cached_at
RETURNING *
"#;

const SELECT_LIVE_CACHE: &str = "SELECT * FROM vessel_cache WHERE mmsi = $1 AND cached_at > $2";

const DELETE_EXPIRED_CACHE: &str = "DELETE FROM vessel_cache WHERE cached_at <= $1";

const INSERT_HISTORY: &str = r#"
INSERT INTO vessel_history (
    mmsi, imo, name, "timestamp", length, width, draft, cog, heading,
    latitude, longitude, weather, weatherdescription, temperature,
    pressure, humidity, windspeed, rain, clouds, message, created_at
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
)
RETURNING *
"#;

macro_rules! select_history {
    ($order:literal) => {
        concat!(
            r#"SELECT * FROM vessel_history
WHERE ($1::text IS NULL OR mmsi = $1)
  AND ($2::timestamptz IS NULL OR created_at >= $2)
  AND ($3::timestamptz IS NULL OR created_at < $3)
  AND ($4::timestamptz IS NULL OR "timestamp" >= $4)
  AND ($5::timestamptz IS NULL OR "timestamp" < $5)
ORDER BY created_at "#,
            $order,
            ", id ",
            $order,
            "\nLIMIT $6"
        )
    };
}

const SELECT_HISTORY_ASC: &str = select_history!("ASC");
const SELECT_HISTORY_DESC: &str = select_history!("DESC");

/// Handle to the PostgreSQL connection pool
///
/// Constructed once at startup and shared with the stores it creates.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool from configuration
    ///
    /// Every connection carries `statement_timeout`, so a stalled statement
    /// is cancelled by the server and either commits or does not.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, VesselStoreError> {
        info!(
            "Connecting to database: max_connections={}, acquire_timeout={:?}, statement_timeout={:?}",
            config.max_connections, config.acquire_timeout, config.statement_timeout
        );

        let options = config.url.parse::<PgConnectOptions>()?.options([(
            "statement_timeout",
            config.statement_timeout.as_millis().to_string(),
        )]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<(), VesselStoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn state_store(&self, clock: Arc<dyn Clock>) -> PgStateStore {
        PgStateStore {
            pool: self.pool.clone(),
            clock,
        }
    }

    pub fn history_log(&self, clock: Arc<dyn Clock>) -> PgHistoryLog {
        PgHistoryLog {
            pool: self.pool.clone(),
            clock,
        }
    }
}

/// Bind the observation columns in table order, `$1` through `$19`
fn bind_observation<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    mmsi: Mmsi,
    observation: &'q VesselObservation,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(mmsi.into_inner())
        .bind(observation.imo)
        .bind(observation.name.as_deref())
        .bind(observation.timestamp)
        .bind(observation.length)
        .bind(observation.width)
        .bind(observation.draft)
        .bind(observation.cog)
        .bind(observation.heading)
        .bind(observation.latitude)
        .bind(observation.longitude)
        .bind(observation.weather.as_deref())
        .bind(observation.weather_description.as_deref())
        .bind(observation.temperature)
        .bind(observation.pressure)
        .bind(observation.humidity)
        .bind(observation.windspeed)
        .bind(observation.rain.as_deref())
        .bind(observation.clouds)
}

/// Vessel cache in table `vessel_cache`
#[derive(Debug, Clone)]
pub struct PgStateStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn put(&self, observation: &VesselObservation) -> Result<CachedState, VesselStoreError> {
        let mmsi = observation.mmsi()?;
        let cached_at = self.clock.now();

        let row: CacheRow = bind_observation(sqlx::query_as(UPSERT_CACHE), mmsi, observation)
            .bind(cached_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn get(&self, mmsi: &Mmsi) -> Result<Option<CachedState>, VesselStoreError> {
        let cutoff = expiry_cutoff(self.clock.now());

        let row: Option<CacheRow> = sqlx::query_as(SELECT_LIVE_CACHE)
            .bind(mmsi.as_str())
            .bind(cutoff)
            .fetch_optional(&self.pool)
            .await?;

        if row.is_none() {
            debug!(%mmsi, "No live cached state");
        }
        Ok(row.map(CachedState::from))
    }
}

#[async_trait]
impl ExpirySweep for PgStateStore {
    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, VesselStoreError> {
        let result = sqlx::query(DELETE_EXPIRED_CACHE)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Append-only history in table `vessel_history`
///
/// A trigger on the table rejects updates and deletes.
#[derive(Debug, Clone)]
pub struct PgHistoryLog {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl HistoryLog for PgHistoryLog {
    async fn append(
        &self,
        observation: &VesselObservation,
        message: Option<&str>,
    ) -> Result<HistoryEntry, VesselStoreError> {
        let mmsi = observation.mmsi()?;
        let created_at = self.clock.now();

        let row: HistoryRow = bind_observation(sqlx::query_as(INSERT_HISTORY), mmsi, observation)
            .bind(message.unwrap_or_default())
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    fn query(&self, query: HistoryQuery) -> BoxStream<'_, Result<HistoryEntry, VesselStoreError>> {
        let sql = match query.order {
            SortOrder::Ascending => SELECT_HISTORY_ASC,
            SortOrder::Descending => SELECT_HISTORY_DESC,
        };

        sqlx::query_as::<_, HistoryRow>(sql)
            .bind(query.mmsi.map(Mmsi::into_inner))
            .bind(query.created_from)
            .bind(query.created_until)
            .bind(query.reported_from)
            .bind(query.reported_until)
            .bind(query.limit.map(i64::from))
            .fetch(&self.pool)
            .map_ok(HistoryEntry::from)
            .map_err(VesselStoreError::from)
            .boxed()
    }
}
