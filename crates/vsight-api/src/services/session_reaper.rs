//! Background service that evicts idle sessions.
//!
//! Each sweep removes sessions untouched for longer than the TTL and cancels
//! any upload or poll they still have in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::metrics;
use crate::sessions::SessionStore;

/// Idle session reaper.
pub struct SessionReaper {
    store: Arc<SessionStore>,
    ttl: Duration,
    sweep_interval: Duration,
}

impl SessionReaper {
    pub fn new(store: Arc<SessionStore>, ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            store,
            ttl,
            sweep_interval,
        }
    }

    /// Run until `shutdown` fires. Spawn this as a background task.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Starting session reaper (ttl: {:?}, interval: {:?})",
            self.ttl, self.sweep_interval
        );

        let mut ticker = interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.sweep_once().await;
        }

        info!("Session reaper stopped");
    }

    /// Run a single sweep and return how many sessions were evicted.
    pub async fn sweep_once(&self) -> usize {
        let evicted = self.store.evict_idle(self.ttl).await.len();
        if evicted > 0 {
            metrics::record_sessions_evicted(evicted);
            info!("Evicted {} idle sessions", evicted);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsight_gemini::{GeminiClient, GeminiConfig};

    fn store() -> Arc<SessionStore> {
        let client = GeminiClient::new(GeminiConfig::new("k").with_base_url("http://127.0.0.1:9")).unwrap();
        Arc::new(SessionStore::new(client, 10))
    }

    #[tokio::test]
    async fn test_sweep_once_evicts_expired() {
        let store = store();
        store.create().await.unwrap();
        store.create().await.unwrap();

        let reaper = SessionReaper::new(Arc::clone(&store), Duration::ZERO, Duration::from_secs(60));
        assert_eq!(reaper.sweep_once().await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_keeps_recent_sessions() {
        let store = store();
        store.create().await.unwrap();

        let reaper = SessionReaper::new(Arc::clone(&store), Duration::from_secs(3600), Duration::from_secs(60));
        assert_eq!(reaper.sweep_once().await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let reaper = SessionReaper::new(store(), Duration::from_secs(1), Duration::from_millis(10));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), reaper.run(shutdown))
            .await
            .unwrap();
    }
}
