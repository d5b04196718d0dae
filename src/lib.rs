//! Vessel state cache and history log
//!
//! Every observation is appended to an immutable history log and refreshes a
//! per-vessel cache entry that expires 24 hours after it was written.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vessel_store::{clock::SystemClock, database::Database, ingest::Ingestor};
//!
//! let db = Database::connect(&config.database).await?;
//! let clock = Arc::new(SystemClock);
//! let ingestor = Ingestor::new(
//!     Arc::new(db.state_store(clock.clone())),
//!     Arc::new(db.history_log(clock)),
//! );
//! ingestor.ingest(&observation, "API Fetch").await?;
//! let current = ingestor.current("123456789").await?;
//! ```

pub mod clock;
pub mod config;
pub mod database;
pub mod errors;
pub mod ingest;
pub mod memory;
pub mod models;
pub mod store;
pub mod sweeper;

pub use errors::VesselStoreError;
pub use ingest::Ingestor;
pub use models::{CachedState, HistoryEntry, HistoryQuery, Mmsi, VesselObservation};
