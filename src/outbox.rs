//! Outbox recovery.
//!
//! Every event is staged as an outbox message in the transaction that
//! writes it and removed once its publish is acknowledged. A message left
//! behind (publish failed, or the process died between commit and publish)
//! is picked up by [`EventStorage::republish_messages`], which a background
//! task started with [`spawn_republish_task`] runs periodically.
//!
//! # Configuration
//!
//! ```yaml
//! outbox:
//!   enabled: true
//!   republish_limit: 100
//!   min_age_secs: 30
//!   max_retries: 10
//!   recovery_interval_secs: 5
//! ```
//!
//! Or via environment: `EVENTSTORAGE__OUTBOX__ENABLED=true`

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::service::EventStorage;
use crate::storage::Session;

/// Outbox recovery configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Run the background republish task.
    pub enabled: bool,
    /// Messages per republish pass. Default: 100
    pub republish_limit: u64,
    /// Minimum message age before a republish may pick it up, so a publish
    /// still in flight elsewhere is not duplicated. Default: 30
    pub min_age_secs: u64,
    /// Failed attempts after which a message is skipped. Default: 10
    pub max_retries: u32,
    /// Seconds between republish passes. Default: 5
    pub recovery_interval_secs: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            republish_limit: 100,
            min_age_secs: 30,
            max_retries: 10,
            recovery_interval_secs: 5,
        }
    }
}

/// Handle to a running republish task.
pub struct RepublishTaskHandle {
    cancel: tokio::sync::watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RepublishTaskHandle {
    /// Signal the task to stop.
    pub fn stop(&self) {
        let _ = self.cancel.send(true);
    }

    /// Stop the task and wait for it to finish its current pass.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            error!(error = %e, "Republish task ended abnormally");
        }
    }
}

/// Spawn a task that republishes pending messages every
/// `recovery_interval_secs`. Returns `None` without spawning when the
/// outbox recovery is disabled.
pub fn spawn_republish_task<S>(
    storage: Arc<EventStorage<S>>,
    config: &OutboxConfig,
) -> Option<RepublishTaskHandle>
where
    S: Session + 'static,
{
    if !config.enabled {
        info!("Republish task disabled");
        return None;
    }
    let (cancel_tx, mut cancel_rx) = tokio::sync::watch::channel(false);
    let interval_secs = config.recovery_interval_secs.max(1);
    let limit = config.republish_limit;

    let task = tokio::spawn(async move {
        let interval = Duration::from_secs(interval_secs);
        info!(interval_secs = interval_secs, "Republish task started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = storage.republish_messages(Some(limit)).await {
                        error!(error = %e, "Republish pass failed");
                    }
                }
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        info!("Republish task stopped");
                        break;
                    }
                }
            }
        }
    });

    Some(RepublishTaskHandle {
        cancel: cancel_tx,
        task,
    })
}
