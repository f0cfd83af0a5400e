//! Purging cached charts when an input file changes.
//!
//! Artifact names embed the ids of every file they were drawn from
//! (`Chart__10_11_12_<stamp>.svg`), so all charts derived from a file are
//! found by scanning the datatype's cache directory for `_<file_id>_`.

use anyhow::{Context, Result};
use std::io::ErrorKind;
use tokio::fs;
use tracing::{debug, info};

use crate::identity::CacheLayout;
use crate::models::{DatatypeId, FileId};

/// Delete every cached entry of `datatype_id` derived from `file_id`.
///
/// Returns the number of files removed. A datatype with no cache directory
/// yet is a no-op, as is an entry that disappears while the scan runs.
pub async fn purge_file(
    layout: &CacheLayout,
    datatype_id: DatatypeId,
    file_id: FileId,
) -> Result<usize> {
    let dir = layout.datatype_dir(datatype_id);
    let needle = format!("_{file_id}_");

    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(datatype_id, file_id, "No chart cache to purge");
            return Ok(0);
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read chart cache: {}", dir.display()));
        }
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name();
        if !name.to_string_lossy().contains(&needle) {
            continue;
        }

        match fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!(path = %entry.path().display(), "Purged cached chart");
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to remove cached chart: {}", entry.path().display())
                });
            }
        }
    }

    info!(datatype_id, file_id, removed, "Invalidated cached charts");
    Ok(removed)
}
