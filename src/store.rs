//! Storage traits for the vessel cache and history log
//!
//! Two backends implement these: [`crate::memory`] for tests and embedding,
//! and [`crate::database`] for PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::BoxStream;

use crate::errors::VesselStoreError;
use crate::models::{CachedState, HistoryEntry, HistoryQuery, Mmsi, VesselObservation};

/// Retention window of a cached state in seconds, measured from `cached_at`
pub const CACHE_TTL_SECS: i64 = 86_400;

/// Retention window of a cached state as a [`TimeDelta`]
pub fn cache_ttl() -> TimeDelta {
    TimeDelta::seconds(CACHE_TTL_SECS)
}

/// Whether a state cached at `cached_at` may still be served at `now`
///
/// Expired at exactly [`CACHE_TTL_SECS`] of age, so the check is never weaker
/// than the physical sweep.
pub fn is_live(cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - cached_at < cache_ttl()
}

/// Oldest `cached_at` still live at `now`; anything at or before this is expired
pub fn expiry_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - cache_ttl()
}

/// Latest state per vessel, self-expiring after [`CACHE_TTL_SECS`]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Insert or replace the cached state of the observation's vessel
    ///
    /// `cached_at` is reset to the current time on every call.
    async fn put(&self, observation: &VesselObservation) -> Result<CachedState, VesselStoreError>;

    /// Live cached state of a vessel, `None` if cold or expired
    async fn get(&self, mmsi: &Mmsi) -> Result<Option<CachedState>, VesselStoreError>;
}

/// Append-only record of every observation
#[async_trait]
pub trait HistoryLog: Send + Sync {
    /// Record a new entry; `None` stores an empty message
    async fn append(
        &self,
        observation: &VesselObservation,
        message: Option<&str>,
    ) -> Result<HistoryEntry, VesselStoreError>;

    /// Lazily stream entries matching `query`
    ///
    /// Each call starts a fresh read.
    fn query(&self, query: HistoryQuery) -> BoxStream<'_, Result<HistoryEntry, VesselStoreError>>;
}

/// Physical removal of expired cache entries
#[async_trait]
pub trait ExpirySweep: Send + Sync {
    /// Remove cache entries with `cached_at <= cutoff`, returning how many
    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, VesselStoreError>;
}
