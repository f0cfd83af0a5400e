//! Per-key build coordination.
//!
//! At most one builder may render a given cache key at a time. Within a
//! process, builders of the same key queue on a shared async mutex kept in a
//! [`DashMap`]; across processes, the holder of the mutex additionally takes
//! the key's [`BuildLock`] file lock. Whoever acquires the permit second must
//! re-check the cache before building, since the first holder has usually
//! produced the artifact by then.

use anyhow::{Context, Result};
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::cache::lock::BuildLock;

type KeyMutex = Arc<Mutex<()>>;

/// Tracks builds in flight, keyed by cache key.
#[derive(Debug, Clone, Default)]
pub struct BuildCoordinator {
    in_flight: Arc<DashMap<String, KeyMutex>>,
}

/// Exclusive right to build one cache key.
///
/// Releases the file lock, then the in-process mutex, when dropped, and
/// forgets the key once nobody else is waiting on it.
#[derive(Debug)]
pub struct BuildPermit {
    key: String,
    file_lock: Option<BuildLock>,
    guard: Option<OwnedMutexGuard<()>>,
    in_flight: Arc<DashMap<String, KeyMutex>>,
}

impl BuildCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other builder holds `key`, then take it.
    ///
    /// # Errors
    ///
    /// Fails if the key stays busy for longer than `timeout`, or if the lock
    /// file cannot be created in `locks_dir`.
    pub async fn acquire(
        &self,
        locks_dir: &Path,
        key: &str,
        timeout: Duration,
    ) -> Result<BuildPermit> {
        let start = Instant::now();
        let mutex = self.in_flight.entry(key.to_string()).or_default().clone();

        let guard = match tokio::time::timeout(timeout, mutex.lock_owned()).await {
            Ok(guard) => guard,
            Err(elapsed) => {
                self.forget_if_idle(key);
                return Err(elapsed)
                    .with_context(|| format!("Timeout waiting for in-flight build of '{key}'"));
            }
        };

        let remaining = timeout.saturating_sub(start.elapsed());
        let file_lock = match BuildLock::acquire_with_timeout(locks_dir, key, remaining).await {
            Ok(lock) => lock,
            Err(e) => {
                drop(guard);
                self.forget_if_idle(key);
                return Err(e);
            }
        };

        debug!(key = %key, wait_ms = start.elapsed().as_millis(), "Build permit acquired");

        Ok(BuildPermit {
            key: key.to_string(),
            file_lock: Some(file_lock),
            guard: Some(guard),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    fn forget_if_idle(&self, key: &str) {
        self.in_flight.remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of keys with a build running or queued.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

impl BuildPermit {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for BuildPermit {
    fn drop(&mut self) {
        self.file_lock.take();
        self.guard.take();
        // Only the map's own reference left: no one is queued on this key
        self.in_flight.remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
