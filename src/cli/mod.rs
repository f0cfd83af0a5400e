//! Command-line interface for linegraph.
//!
//! The `linegraph` binary drives the plugin outside the host platform, for
//! operators and scripts:
//!
//! - `render` - render a chart request stored as JSON
//! - `invalidate` - purge cached charts drawn from a file
//! - `config` - create, show or locate the configuration file
//!
//! Global flags:
//! - `--verbose` enables debug logging
//! - `--quiet` disables logging
//! - `--config <PATH>` uses a specific configuration file

mod config;
mod invalidate;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::PluginConfig;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter (`debug`, `info`), `None` to disable logging.
    pub log_level: Option<String>,
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tracing subscriber. `RUST_LOG` wins over the flag level.
    pub fn init_logging(&self) {
        let Some(level) = &self.log_level else {
            return;
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Load the plugin configuration these flags point at.
    pub async fn load_plugin_config(&self) -> Result<PluginConfig> {
        PluginConfig::load_with_optional(self.config_path.clone()).await
    }
}

#[derive(Parser)]
#[command(
    name = "linegraph",
    about = "Line chart rendering with an on-disk SVG cache",
    version,
    long_about = "linegraph renders line charts of uploaded data files through an external \
                  render service and caches the resulting SVGs below the web root."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "LINEGRAPH_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a chart request stored as JSON
    Render(render::RenderCommand),

    /// Purge cached charts drawn from an uploaded file
    Invalidate(invalidate::InvalidateCommand),

    /// Manage the configuration file
    Config(config::ConfigCommand),
}

impl Cli {
    /// Run the selected command with logging set up from the global flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Render(cmd) => cmd.execute(&config).await,
            Commands::Invalidate(cmd) => cmd.execute(&config).await,
            Commands::Config(cmd) => cmd.execute(config.config_path).await,
        }
    }
}
