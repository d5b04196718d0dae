//! Ingestion coordinator
//!
//! Writes every observation to the history log first, then refreshes the
//! vessel cache. History is the system of record: it is never rolled back,
//! so a failed cache refresh surfaces as [`VesselStoreError::PartialWrite`].
//!
//! Only the cache step carries a client-side timeout. Abandoning an append
//! that the log may already have committed would report a recorded entry as
//! a total failure, so the history step is bounded by the backend instead
//! (`statement_timeout` on PostgreSQL).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use tracing::{info, warn};

use crate::{
    errors::VesselStoreError,
    models::{CachedState, HistoryEntry, HistoryQuery, IngestOutcome, Mmsi, VesselObservation},
    store::{HistoryLog, StateStore},
};

/// Default bound on the cache write
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Single entry point for recording vessel observations
///
/// Holds no records between calls; clones share the same stores.
#[derive(Clone)]
pub struct Ingestor {
    state: Arc<dyn StateStore>,
    history: Arc<dyn HistoryLog>,
    write_timeout: Duration,
}

impl Ingestor {
    pub fn new(state: Arc<dyn StateStore>, history: Arc<dyn HistoryLog>) -> Self {
        Self {
            state,
            history,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Record an observation in both stores
    ///
    /// The MMSI is validated before either store is touched.
    pub async fn ingest(
        &self,
        observation: &VesselObservation,
        message: &str,
    ) -> Result<IngestOutcome, VesselStoreError> {
        let mmsi = observation.mmsi()?;

        let history = self.history.append(observation, Some(message)).await?;

        let cached = match self.bounded(self.state.put(observation)).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(%mmsi, history_id = history.id, "Cache refresh failed after history append: {}", e);
                return Err(VesselStoreError::PartialWrite {
                    history: Box::new(history),
                    source: Box::new(e),
                });
            }
        };

        info!(%mmsi, history_id = history.id, provenance = message, "Ingested observation");
        Ok(IngestOutcome { cached, history })
    }

    /// Retry only the cache step of an ingestion
    ///
    /// Meant for recovering from [`VesselStoreError::PartialWrite`] without
    /// appending a second history entry.
    pub async fn refresh_cache(
        &self,
        history: &HistoryEntry,
    ) -> Result<CachedState, VesselStoreError> {
        self.bounded(self.state.put(&history.observation)).await
    }

    /// Latest live state of a vessel, `None` if never seen or expired
    pub async fn current(&self, mmsi: &str) -> Result<Option<CachedState>, VesselStoreError> {
        let mmsi = Mmsi::try_from(mmsi)?;
        self.state.get(&mmsi).await
    }

    /// Stream history entries matching `query`
    pub fn history(
        &self,
        query: HistoryQuery,
    ) -> BoxStream<'_, Result<HistoryEntry, VesselStoreError>> {
        self.history.query(query)
    }

    async fn bounded<T>(
        &self,
        write: impl Future<Output = Result<T, VesselStoreError>>,
    ) -> Result<T, VesselStoreError> {
        tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| {
                VesselStoreError::StoreUnavailable(format!(
                    "cache write timed out after {:?}",
                    self.write_timeout
                ))
            })?
    }
}
