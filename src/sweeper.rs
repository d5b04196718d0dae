//! Background removal of expired cache entries
//!
//! Reads never depend on this task: [`crate::store::StateStore::get`] checks
//! age itself. The sweep only reclaims space.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    store::{expiry_cutoff, ExpirySweep},
};

/// Handle to a running sweeper task
///
/// Dropping the handle stops the task at its next wake-up.
pub struct ExpirySweeper {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Spawn a task sweeping `store` every `interval`
    pub fn spawn(store: Arc<dyn ExpirySweep>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(Self::run(store, clock, interval, rx));
        info!("Expiry sweeper started: interval={:?}", interval);

        Self {
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Expiry sweeper task failed: {}", e);
            }
        }
    }

    async fn run(
        store: Arc<dyn ExpirySweep>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let cutoff = expiry_cutoff(clock.now());
                    match store.sweep_expired(cutoff).await {
                        Ok(0) => {}
                        Ok(removed) => debug!(removed, %cutoff, "Swept expired cache entries"),
                        Err(e) => warn!("Expiry sweep failed: {}", e),
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
