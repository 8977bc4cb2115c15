//! Time-bounded snapshot of externally fetched data.
//!
//! Bounds staleness against upstream load: the first caller after expiry
//! refetches, concurrent callers wait on the same lock and reuse the result.
//! A failed refetch clears the snapshot and returns the error, so stale data
//! is never served silently.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::SourceConfig;

/// Default snapshot lifetime
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

pub struct SnapshotCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone + Send> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(Duration::from_secs(config.cache_ttl_secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached snapshot if fresh, otherwise call `fetch`.
    pub async fn get_or_refresh<F, Fut, E>(&self, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some((fetched_at, value)) = &*slot {
            if fetched_at.elapsed() < self.ttl {
                return Ok(value.clone());
            }
        }

        debug!(ttl_secs = self.ttl.as_secs(), "Snapshot expired, refetching");
        match fetch().await {
            Ok(value) => {
                *slot = Some((Instant::now(), value.clone()));
                Ok(value)
            }
            Err(e) => {
                *slot = None;
                Err(e)
            }
        }
    }
}
