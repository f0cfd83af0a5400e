//! On-disk chart cache with lazy, coordinated builds.
//!
//! Cached artifacts live below the web root, one directory per datatype:
//!
//! ```text
//! <web_root>/uploads/files/graphs/
//! └── datatype_5/
//!     ├── Chart__10_1700000000123456.svg        # per-record chart
//!     ├── Chart__10_11_12_1700000000123456.svg  # combined chart
//!     └── .locks/
//!         └── Chart__10_11_12_1700000000123456.lock
//! ```
//!
//! A present file is a hit and is returned as-is: there is no TTL and no
//! content validation. A miss runs the caller's build closure, with at most
//! one builder per key at a time:
//!
//! ```text
//! Request A: miss ─ acquire(key) ─ build ─ release
//! Request B: miss ─ acquire(key) ·······wait······· ─ re-check: hit
//! Request C: miss ─ acquire(other key) ─ build        (concurrent)
//! ```
//!
//! Entries are never rewritten. Option changes produce new names (see
//! [`crate::identity`]); file changes are handled by
//! [`invalidation::purge_file`].

pub mod coordinator;
pub mod invalidation;
pub mod lock;

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::default_lock_timeout;
use crate::identity::{CacheLayout, ChartKey};
use crate::models::DatatypeId;

pub use coordinator::{BuildCoordinator, BuildPermit};
pub use invalidation::purge_file;
pub use lock::{BuildLock, cleanup_stale_locks};

/// How a cached chart was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The artifact already existed.
    Hit(PathBuf),
    /// The artifact was built by this call.
    Built(PathBuf),
}

impl CacheOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Hit(path) | Self::Built(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Self::Hit(path) | Self::Built(path) => path,
        }
    }

    pub fn was_built(&self) -> bool {
        matches!(self, Self::Built(_))
    }
}

/// The chart cache of one web root.
#[derive(Debug, Clone)]
pub struct ChartCache {
    layout: CacheLayout,
    coordinator: BuildCoordinator,
    lock_timeout: Duration,
}

impl ChartCache {
    pub fn new(layout: CacheLayout) -> Self {
        Self {
            layout,
            coordinator: BuildCoordinator::new(),
            lock_timeout: default_lock_timeout(),
        }
    }

    /// Override how long a miss waits for another builder of the same key.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn coordinator(&self) -> &BuildCoordinator {
        &self.coordinator
    }

    /// The cached artifact at `path`, if present.
    pub async fn lookup(&self, path: &Path) -> Option<PathBuf> {
        match tokio::fs::try_exists(path).await {
            Ok(true) => Some(path.to_path_buf()),
            _ => None,
        }
    }

    /// Create the cache directory of `datatype_id` if needed.
    pub async fn ensure_datatype_dir(&self, datatype_id: DatatypeId) -> Result<PathBuf> {
        let dir = self.layout.datatype_dir(datatype_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create chart cache directory: {}", dir.display()))?;
        Ok(dir)
    }

    /// Return the artifact for `key`, building it with `build` on a miss.
    ///
    /// `build` receives the final artifact path and must leave the artifact
    /// there on success. It runs while holding the key's build permit; a
    /// concurrent caller for the same key waits, then finds the artifact and
    /// returns [`CacheOutcome::Hit`] without building.
    ///
    /// # Errors
    ///
    /// Propagates errors from `build`, and fails when the key stays busy
    /// longer than the lock timeout.
    pub async fn get_or_build<F, Fut>(
        &self,
        datatype_id: DatatypeId,
        key: &ChartKey,
        build: F,
    ) -> Result<CacheOutcome>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let path = self.layout.artifact_path(datatype_id, key);
        if let Some(hit) = self.lookup(&path).await {
            debug!(path = %hit.display(), "Chart cache hit");
            return Ok(CacheOutcome::Hit(hit));
        }

        self.ensure_datatype_dir(datatype_id).await?;
        let stem = key.stem();
        let _permit = self
            .coordinator
            .acquire(&self.layout.locks_dir(datatype_id), &stem, self.lock_timeout)
            .await?;

        if let Some(hit) = self.lookup(&path).await {
            debug!(path = %hit.display(), "Chart built by a concurrent request");
            return Ok(CacheOutcome::Hit(hit));
        }

        info!(key = %stem, datatype_id, "Chart cache miss, building");
        build(path.clone()).await?;
        Ok(CacheOutcome::Built(path))
    }
}
