//! Plugin configuration.
//!
//! Deployment settings live in a TOML file, looked up in this order:
//!
//! 1. an explicit path (`--config`)
//! 2. the `LINEGRAPH_CONFIG_PATH` environment variable
//! 3. `~/.linegraph/config.toml`
//!
//! A missing file is not an error: every field has a default.
//!
//! ```toml
//! web_root = "/var/www/data"
//! site_base_url = "https://data.example.org"
//! scratch_dir = "/tmp/linegraph"
//! chart_script_url = "/js/linegraph.js"
//! lock_timeout_secs = 120
//! decrypt_command = ["/usr/local/bin/decrypt-upload", "{file_id}", "{path}"]
//!
//! [render_service]
//! host = "127.0.0.1"
//! port = 9494
//! timeout_secs = 60
//! poll_attempts = 10
//! poll_interval_ms = 100
//! ```
//!
//! Per-datatype settings (field bindings, chart options) are not part of this
//! file; they arrive with each render request.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    DEFAULT_RENDER_HOST, DEFAULT_RENDER_PORT, OUTPUT_POLL_ATTEMPTS, OUTPUT_POLL_INTERVAL_MS,
    default_lock_timeout, default_render_timeout,
};
use crate::core::ChartError;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "LINEGRAPH_CONFIG_PATH";

/// Deployment configuration of the chart plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Filesystem root served by the web server; the chart cache lives below it.
    pub web_root: PathBuf,

    /// Public base URL of `web_root`, used to build page URLs for the renderer.
    pub site_base_url: String,

    /// Private directory for raw renderer output.
    pub scratch_dir: PathBuf,

    /// Script drawing the chart inside pages and fragments.
    pub chart_script_url: String,

    /// Seconds a build waits for another build of the same chart.
    pub lock_timeout_secs: u64,

    /// Command producing the plaintext of an encrypted upload.
    ///
    /// Arguments may use `{file_id}` and `{path}`. Without a command, uploads
    /// are expected to be stored in plaintext.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decrypt_command: Option<Vec<String>>,

    pub render_service: RenderServiceConfig,
}

/// Location and timing of the render service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderServiceConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on one render call.
    pub timeout_secs: u64,
    /// Checks for the output file after the call returns.
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
}

impl Default for RenderServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RENDER_HOST.to_string(),
            port: DEFAULT_RENDER_PORT,
            timeout_secs: default_render_timeout().as_secs(),
            poll_attempts: OUTPUT_POLL_ATTEMPTS,
            poll_interval_ms: OUTPUT_POLL_INTERVAL_MS,
        }
    }
}

impl RenderServiceConfig {
    /// `http://<host>:<port>/`
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            web_root: PathBuf::from("/var/www/html"),
            site_base_url: "http://localhost".to_string(),
            scratch_dir: std::env::temp_dir().join("linegraph"),
            chart_script_url: "/js/linegraph.js".to_string(),
            lock_timeout_secs: default_lock_timeout().as_secs(),
            decrypt_command: None,
            render_service: RenderServiceConfig::default(),
        }
    }
}

impl PluginConfig {
    /// Load from the first location that applies (see the module docs).
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            anyhow::Error::from(ChartError::ConfigFileError {
                path: path.display().to_string(),
                reason: e.to_string().trim().to_string(),
            })
        })
    }

    /// Write as pretty TOML, creating parent directories as needed.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// The file [`load_with_optional`](Self::load_with_optional) would read.
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Self::default_path(),
        }
    }

    /// `~/.linegraph/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(".linegraph").join("config.toml"))
    }

    /// Configuration written by `linegraph config init`.
    #[must_use]
    pub fn init_example() -> Self {
        Self {
            web_root: PathBuf::from("/var/www/html"),
            site_base_url: "https://data.example.org".to_string(),
            decrypt_command: Some(vec![
                "/usr/local/bin/decrypt-upload".to_string(),
                "{file_id}".to_string(),
                "{path}".to_string(),
            ]),
            ..Self::default()
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Public URL of `url_path` (`/uploads/...`).
    pub fn public_url(&self, url_path: &str) -> String {
        format!("{}{}", self.site_base_url.trim_end_matches('/'), url_path)
    }
}
