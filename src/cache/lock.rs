//! File locking for chart builds.
//!
//! A [`BuildLock`] gives one process exclusive ownership of a cache key while
//! it renders the artifact. Locks live next to the artifacts they protect and
//! are released when the lock object is dropped.
//!
//! # Async Safety
//!
//! All blocking file operations run in `spawn_blocking`, so waiting for a
//! lock never stalls the tokio worker threads.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, default_lock_timeout};

/// An exclusive, cross-process lock on one cache key.
#[derive(Debug)]
pub struct BuildLock {
    file: Arc<File>,
    lock_name: String,
    lock_path: PathBuf,
}

impl BuildLock {
    /// Acquire the lock named `lock_name` in `locks_dir` with the default timeout.
    pub async fn acquire(locks_dir: &Path, lock_name: &str) -> Result<Self> {
        Self::acquire_with_timeout(locks_dir, lock_name, default_lock_timeout()).await
    }

    /// Acquire the lock named `lock_name` in `locks_dir`, giving up after `timeout`.
    ///
    /// The lock file is `{locks_dir}/{lock_name}.lock`; `locks_dir` is created
    /// if needed. Acquisition polls with exponential backoff (10ms doubling up
    /// to 500ms) until the lock is free or the timeout elapses.
    ///
    /// # Errors
    ///
    /// Fails if the lock directory or file cannot be created, or if another
    /// holder keeps the lock for longer than `timeout`.
    pub async fn acquire_with_timeout(
        locks_dir: &Path,
        lock_name: &str,
        timeout: Duration,
    ) -> Result<Self> {
        debug!(lock_name = %lock_name, "Waiting for build lock");

        tokio::fs::create_dir_all(locks_dir).await.with_context(|| {
            format!("Failed to create locks directory: {}", locks_dir.display())
        })?;

        let lock_path = locks_dir.join(format!("{lock_name}.lock"));

        let lock_path_clone = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&lock_path_clone)
        })
        .await
        .with_context(|| "spawn_blocking panicked")?
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        let file = Arc::new(file);
        let start = std::time::Instant::now();

        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let file_clone = Arc::clone(&file);
            let lock_result = tokio::task::spawn_blocking(move || file_clone.try_lock_exclusive())
                .await
                .with_context(|| "spawn_blocking panicked")?;

            match lock_result {
                Ok(true) => {
                    debug!(
                        lock_name = %lock_name,
                        wait_ms = start.elapsed().as_millis(),
                        "Build lock acquired"
                    );
                    return Ok(Self {
                        file,
                        lock_name: lock_name.to_string(),
                        lock_path,
                    });
                }
                Ok(false) | Err(_) => {
                    let remaining = timeout.saturating_sub(start.elapsed());
                    if remaining.is_zero() {
                        return Err(anyhow::anyhow!(
                            "Timeout acquiring build lock '{}' after {:?}",
                            lock_name,
                            timeout
                        ));
                    }
                    tokio::time::sleep(delay.min(remaining)).await;
                }
            }
        }

        Err(anyhow::anyhow!("Timeout acquiring build lock '{}' after {:?}", lock_name, timeout))
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.file.as_ref()) {
            debug!(lock_name = %self.lock_name, error = %e, "Failed to unlock build lock");
        }
        debug!(lock_name = %self.lock_name, "Build lock released");
    }
}

/// Remove lock files older than `ttl_seconds` from `locks_dir`.
///
/// Lock files are left behind after release so that concurrent waiters never
/// race on a deleted inode; this sweeps the ones nobody has touched for a
/// while. Returns the number of files removed.
pub async fn cleanup_stale_locks(locks_dir: &Path, ttl_seconds: u64) -> Result<usize> {
    use std::time::SystemTime;
    use tokio::fs;

    if !fs::try_exists(locks_dir).await.unwrap_or(false) {
        return Ok(0);
    }

    let mut removed_count = 0;
    let now = SystemTime::now();
    let ttl_duration = Duration::from_secs(ttl_seconds);

    let mut entries = fs::read_dir(locks_dir).await.context("Failed to read locks directory")?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("lock") {
            continue;
        }

        let Ok(metadata) = fs::metadata(&path).await else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };

        if let Ok(age) = now.duration_since(modified)
            && age > ttl_duration
            && fs::remove_file(&path).await.is_ok()
        {
            removed_count += 1;
        }
    }

    Ok(removed_count)
}
