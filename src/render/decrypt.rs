//! Plaintext materialization of encrypted uploads.
//!
//! Uploaded data files are stored encrypted; the renderer needs plaintext on
//! disk. A plaintext that already exists is reused as-is. Otherwise the
//! [`Decryptor`] produces it, and if the file is not public yet the plaintext
//! is deleted once every build using it has finished (see
//! [`PlaintextRegistry`]).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::try_join_all;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::ChartError;
use crate::models::{ChartFile, FileId};
use crate::render::guard::TransientFile;

/// Produces the plaintext of an uploaded file.
pub trait Decryptor: Send + Sync {
    /// Decrypt `file` and return where its plaintext now lives.
    fn decrypt<'a>(
        &'a self,
        file: &'a ChartFile,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;
}

/// For deployments that store uploads unencrypted: every plaintext must
/// already exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecryptor;

impl Decryptor for NoDecryptor {
    fn decrypt<'a>(
        &'a self,
        file: &'a ChartFile,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            Err(ChartError::DecryptFailed {
                file_id: file.id,
                reason: format!(
                    "plaintext {} is missing and no decrypt command is configured",
                    file.local_path.display()
                ),
            }
            .into())
        })
    }
}

/// Runs an external command to decrypt a file.
///
/// Arguments may contain `{file_id}` and `{path}`, replaced by the file id and
/// the expected plaintext path. If the command prints a path on stdout, that
/// path is used; otherwise the plaintext is expected at `{path}`.
#[derive(Debug, Clone)]
pub struct CommandDecryptor {
    argv: Vec<String>,
}

impl CommandDecryptor {
    /// # Errors
    ///
    /// Fails when `argv` is empty.
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            anyhow::bail!("Decrypt command cannot be empty");
        }
        Ok(Self {
            argv,
        })
    }

    fn expand(&self, file: &ChartFile) -> Vec<String> {
        let path = file.local_path.to_string_lossy();
        self.argv
            .iter()
            .map(|arg| arg.replace("{file_id}", &file.id.to_string()).replace("{path}", &path))
            .collect()
    }
}

impl Decryptor for CommandDecryptor {
    fn decrypt<'a>(
        &'a self,
        file: &'a ChartFile,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            let argv = self.expand(file);
            debug!(file_id = file.id, command = %argv.join(" "), "Running decrypt command");

            let output = Command::new(&argv[0])
                .args(&argv[1..])
                .output()
                .await
                .with_context(|| format!("Failed to run decrypt command '{}'", argv[0]))?;

            if !output.status.success() {
                return Err(ChartError::DecryptFailed {
                    file_id: file.id,
                    reason: format!(
                        "decrypt command exited with {}: {}",
                        output.status,
                        String::from_utf8_lossy(&output.stderr).trim()
                    ),
                }
                .into());
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            let printed = stdout.trim();
            let path =
                if printed.is_empty() { file.local_path.clone() } else { PathBuf::from(printed) };

            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(ChartError::DecryptFailed {
                    file_id: file.id,
                    reason: format!("decrypt command left no plaintext at {}", path.display()),
                }
                .into());
            }
            Ok(path)
        })
    }
}

/// Plaintext of one contributing file, held for the duration of a build.
///
/// Dropping it releases the build's claim on the plaintext.
#[derive(Debug)]
pub struct MaterializedFile {
    pub file_id: FileId,
    path: PathBuf,
    claims: Arc<DashMap<FileId, Claim>>,
}

impl MaterializedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the plaintext is deleted once its last holder releases it.
    pub fn is_scheduled_for_deletion(&self) -> bool {
        self.claims.get(&self.file_id).is_some_and(|claim| claim.cleanup.is_some())
    }
}

impl Drop for MaterializedFile {
    fn drop(&mut self) {
        if let Entry::Occupied(mut entry) = self.claims.entry(self.file_id) {
            let claim = entry.get_mut();
            claim.holders = claim.holders.saturating_sub(1);
            if claim.holders == 0 {
                // Delete while the entry is locked so a new claimant re-decrypts
                drop(claim.cleanup.take());
                entry.remove();
            }
        }
    }
}

/// Builds currently using one plaintext.
#[derive(Debug)]
struct Claim {
    holders: usize,
    path: PathBuf,
    cleanup: Option<TransientFile>,
}

/// Plaintexts in use by running builds.
///
/// Builds of different charts share contributing files, so a plaintext is
/// claimed per file id rather than per build. The first claimant decrypts
/// it when absent; a plaintext decrypted for a non-public file is deleted
/// when the last claim is released.
#[derive(Debug, Clone, Default)]
pub struct PlaintextRegistry {
    claims: Arc<DashMap<FileId, Claim>>,
    gates: Arc<DashMap<FileId, Arc<Mutex<()>>>>,
}

impl PlaintextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files with a live claim.
    pub fn claimed_count(&self) -> usize {
        self.claims.len()
    }

    /// Make the plaintext of `file` available, decrypting only if it is absent.
    pub async fn materialize(
        &self,
        decryptor: &dyn Decryptor,
        file: &ChartFile,
        now: DateTime<Utc>,
    ) -> Result<MaterializedFile> {
        let gate = self.gates.entry(file.id).or_default().clone();
        let result = {
            let _serialized = gate.lock().await;
            self.claim(decryptor, file, now).await
        };
        drop(gate);
        self.gates.remove_if(&file.id, |_, gate| Arc::strong_count(gate) == 1);
        result
    }

    async fn claim(
        &self,
        decryptor: &dyn Decryptor,
        file: &ChartFile,
        now: DateTime<Utc>,
    ) -> Result<MaterializedFile> {
        if let Some(mut claim) = self.claims.get_mut(&file.id) {
            claim.holders += 1;
            debug!(file_id = file.id, holders = claim.holders, "Sharing claimed plaintext");
            return Ok(self.lease(file.id, claim.path.clone()));
        }

        let (path, cleanup) = if tokio::fs::try_exists(&file.local_path).await.unwrap_or(false) {
            debug!(file_id = file.id, "Reusing existing plaintext");
            (file.local_path.clone(), None)
        } else {
            let path = decryptor.decrypt(file).await?;
            let cleanup = if file.is_public_at(now) {
                None
            } else {
                debug!(
                    file_id = file.id,
                    path = %path.display(),
                    "Scheduling non-public plaintext for deletion"
                );
                Some(TransientFile::new(&path))
            };
            (path, cleanup)
        };

        self.claims.insert(
            file.id,
            Claim {
                holders: 1,
                path: path.clone(),
                cleanup,
            },
        );
        Ok(self.lease(file.id, path))
    }

    fn lease(&self, file_id: FileId, path: PathBuf) -> MaterializedFile {
        MaterializedFile {
            file_id,
            path,
            claims: Arc::clone(&self.claims),
        }
    }

    /// [`materialize`](Self::materialize) every file concurrently.
    ///
    /// On failure, claims already taken by this call are released as the
    /// partial results are dropped.
    pub async fn materialize_all(
        &self,
        decryptor: &dyn Decryptor,
        files: &[ChartFile],
        now: DateTime<Utc>,
    ) -> Result<Vec<MaterializedFile>> {
        try_join_all(files.iter().map(|file| self.materialize(decryptor, file, now))).await
    }
}
