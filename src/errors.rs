//! Errors for the vessel store
use thiserror::Error;

use crate::models::HistoryEntry;

#[derive(Error, Debug)]
pub enum VesselStoreError {
    #[error("Invalid MMSI: {0:?}")]
    InvalidMmsi(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// History entry was recorded but the cache refresh failed.
    ///
    /// The history write is never rolled back; retry the cache step alone
    /// with [`crate::ingest::Ingestor::refresh_cache`].
    #[error("Partial write: history entry {} recorded, cache refresh failed", .history.id)]
    PartialWrite {
        history: Box<HistoryEntry>,
        #[source]
        source: Box<VesselStoreError>,
    },

    #[error("Database error")]
    DatabaseError(#[source] sqlx::Error),

    #[error("Database migration error")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),
}

/// SQLSTATE of a statement cancelled by `statement_timeout`
const QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for VesselStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => VesselStoreError::StoreUnavailable(e.to_string()),
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                VesselStoreError::StoreUnavailable(e.to_string())
            }
            other => VesselStoreError::DatabaseError(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_errors_are_unavailable() {
        let err = VesselStoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, VesselStoreError::StoreUnavailable(_)));

        let err = VesselStoreError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, VesselStoreError::StoreUnavailable(_)));
    }

    #[test]
    fn query_errors_stay_database_errors() {
        let err = VesselStoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, VesselStoreError::DatabaseError(_)));
    }
}
