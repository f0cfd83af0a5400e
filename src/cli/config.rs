//! Manage the linegraph configuration file.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::PluginConfig;

/// Create, show or locate the configuration file.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Write an example configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        match self.command {
            Some(ConfigSubcommands::Init {
                force,
            }) => Self::init(force, config_path).await,
            Some(ConfigSubcommands::Show) | None => Self::show(config_path).await,
            Some(ConfigSubcommands::Path) => Self::show_path(config_path),
        }
    }

    async fn init(force: bool, config_path: Option<PathBuf>) -> Result<()> {
        let config_path = PluginConfig::resolve_path(config_path)?;

        if config_path.exists() && !force {
            println!("❌ Config already exists at: {}", config_path.display());
            println!("   Use --force to overwrite");
            return Ok(());
        }

        let config = PluginConfig::init_example();
        config.save_to(&config_path).await?;

        println!("✅ Created config at: {}", config_path.display());
        println!("\n{}", "Example configuration:".bold());
        println!("{}", toml::to_string_pretty(&config)?);
        println!("\n{}", "Next steps:".yellow());
        println!("  1. Point web_root and site_base_url at your web server");
        println!("  2. Set decrypt_command, or remove it if uploads are stored unencrypted");
        Ok(())
    }

    async fn show(config_path: Option<PathBuf>) -> Result<()> {
        let path = PluginConfig::resolve_path(config_path.clone())?;
        let config = PluginConfig::load_with_optional(config_path).await?;

        println!("{}", "linegraph Configuration".bold());
        if path.exists() {
            println!("Location: {}\n", path.display());
        } else {
            println!("Location: {} {}\n", path.display(), "(not found, using defaults)".yellow());
        }
        println!("{}", toml::to_string_pretty(&config)?);
        Ok(())
    }

    fn show_path(config_path: Option<PathBuf>) -> Result<()> {
        let path = PluginConfig::resolve_path(config_path)?;
        println!("{}", path.display());
        Ok(())
    }
}
