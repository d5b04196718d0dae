//! Vessel store service
//!
//! Reads newline-delimited JSON observations from stdin and records each one
//! in the cache and the history log.

use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

use vessel_store::{
    clock::{Clock, SystemClock},
    config::AppConfig,
    database::Database,
    errors::VesselStoreError,
    ingest::Ingestor,
    models::VesselObservation,
    sweeper::ExpirySweeper,
};

const DEFAULT_MESSAGE: &str = "Stream Ingest";

/// One input line: an observation plus optional provenance
#[derive(Debug, Deserialize)]
struct IngestRequest {
    #[serde(flatten)]
    observation: VesselObservation,
    message: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), VesselStoreError> {
    #[cfg(feature = "dotenvy")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = Arc::new(db.state_store(clock.clone()));
    let history = Arc::new(db.history_log(clock.clone()));

    let sweeper = ExpirySweeper::spawn(state.clone(), clock, config.cache.sweep_interval);
    let ingestor = Ingestor::new(state, history).with_write_timeout(config.cache.write_timeout);

    let result = tokio::select! {
        result = run_ingest(&ingestor, BufReader::new(tokio::io::stdin())) => match result {
            Ok(()) => {
                info!("Input exhausted");
                Ok(())
            }
            Err(e) => {
                error!("Failed to read input: {}", e);
                Err(e)
            }
        },
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    sweeper.shutdown().await;
    result
}

async fn run_ingest<R>(ingestor: &Ingestor, input: R) -> Result<(), VesselStoreError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: IngestRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Skipping malformed input line: {}", e);
                continue;
            }
        };

        let message = request.message.as_deref().unwrap_or(DEFAULT_MESSAGE);
        match ingestor.ingest(&request.observation, message).await {
            Ok(_) => {}
            Err(VesselStoreError::PartialWrite { history, source }) => {
                error!(
                    "Cache refresh failed for history entry {}: {}; retrying cache step",
                    history.id, source
                );
                if let Err(e) = ingestor.refresh_cache(&history).await {
                    error!("Cache retry failed: {}", e);
                }
            }
            Err(e) => error!("Ingestion error: {}", e),
        }
    }

    Ok(())
}
