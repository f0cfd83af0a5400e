//! Scoped deletion of transient build files.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Deletes a file when dropped, unless disarmed.
///
/// Builds create intermediate pages, raw renderer output and decrypted
/// plaintexts; holding each behind a guard removes them on every exit path,
/// including `?` returns and panics.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    armed: bool,
}

impl TransientFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file: dropping the guard no longer deletes it.
    pub fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed transient file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove transient file");
            }
        }
    }
}
