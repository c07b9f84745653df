//! Background service that evicts expired analysis sessions.
//!
//! Sessions are purely in-memory, so without eviction the store would grow
//! for as long as the process lives. The sweeper runs periodically and drops
//! sessions older than the configured TTL.

use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info};

use super::session_store::SessionStore;

/// Interval between eviction runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Session eviction service.
pub struct SessionSweeper {
    store: SessionStore,
    ttl: Duration,
    enabled: bool,
}

impl SessionSweeper {
    pub fn new(store: SessionStore, ttl: Duration) -> Self {
        let enabled = std::env::var("ENABLE_SESSION_SWEEPER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Self {
            store,
            ttl,
            enabled,
        }
    }

    /// Start the eviction loop.
    ///
    /// Runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Session sweeper is disabled");
            return;
        }

        info!(ttl_secs = self.ttl.as_secs(), "Starting session sweeper");

        let mut ticker = interval(SWEEP_INTERVAL);

        loop {
            ticker.tick().await;

            let evicted = self.store.evict_older_than(self.ttl).await;
            if evicted > 0 {
                info!(evicted, "Evicted expired sessions");
            } else {
                debug!("No expired sessions");
            }
        }
    }
}
