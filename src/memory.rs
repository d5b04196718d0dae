//! In-memory storage backend
//!
//! Same semantics as the PostgreSQL backend, without persistence. Suitable
//! for tests, simulation and embedding.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::{
    clock::Clock,
    errors::VesselStoreError,
    models::{CachedState, HistoryEntry, HistoryQuery, Mmsi, SortOrder, VesselObservation},
    store::{is_live, ExpirySweep, HistoryLog, StateStore},
};

/// In-memory vessel cache keyed by MMSI
#[derive(Debug)]
pub struct InMemoryStateStore {
    entries: Mutex<HashMap<Mmsi, CachedState>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStateStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of physically present entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn put(&self, observation: &VesselObservation) -> Result<CachedState, VesselStoreError> {
        let mmsi = observation.mmsi()?;
        let cached = CachedState {
            observation: VesselObservation {
                mmsi: mmsi.as_str().to_string(),
                ..observation.clone()
            },
            cached_at: self.clock.now(),
        };

        trace!(%mmsi, "Caching vessel state");
        self.entries.lock().await.insert(mmsi, cached.clone());
        Ok(cached)
    }

    async fn get(&self, mmsi: &Mmsi) -> Result<Option<CachedState>, VesselStoreError> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;

        match entries.get(mmsi) {
            Some(cached) if is_live(cached.cached_at, now) => Ok(Some(cached.clone())),
            Some(_) => {
                debug!(%mmsi, "Cached state expired, awaiting sweep");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ExpirySweep for InMemoryStateStore {
    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, VesselStoreError> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, cached| cached.cached_at > cutoff);
        Ok((before - entries.len()) as u64)
    }
}

/// In-memory append-only history log
#[derive(Debug)]
pub struct InMemoryHistoryLog {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryHistoryLog {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl HistoryLog for InMemoryHistoryLog {
    async fn append(
        &self,
        observation: &VesselObservation,
        message: Option<&str>,
    ) -> Result<HistoryEntry, VesselStoreError> {
        let mmsi = observation.mmsi()?;
        let mut entries = self.entries.lock().await;

        let entry = HistoryEntry {
            id: entries.len() as i64 + 1,
            observation: VesselObservation {
                mmsi: mmsi.into_inner(),
                ..observation.clone()
            },
            message: message.unwrap_or_default().to_string(),
            created_at: self.clock.now(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn query(&self, query: HistoryQuery) -> BoxStream<'_, Result<HistoryEntry, VesselStoreError>> {
        let entries = Arc::clone(&self.entries);

        stream::once(async move {
            let entries = entries.lock().await;
            let mut selected: Vec<HistoryEntry> = entries
                .iter()
                .filter(|entry| query.matches(entry))
                .cloned()
                .collect();
            drop(entries);

            selected.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
            if query.order == SortOrder::Descending {
                selected.reverse();
            }
            if let Some(limit) = query.limit {
                selected.truncate(limit as usize);
            }
            selected
        })
        .flat_map(|selected| stream::iter(selected.into_iter().map(Ok)))
        .boxed()
    }
}
