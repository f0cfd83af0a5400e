//! Purge cached charts after a file was replaced or deleted.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use crate::models::{DatatypeId, FileId};
use crate::plugin::LineChartPlugin;

/// Remove every cached chart of a datatype drawn from a file.
#[derive(Args)]
pub struct InvalidateCommand {
    /// Datatype owning the cache
    #[arg(long)]
    datatype: DatatypeId,

    /// File that changed
    #[arg(long)]
    file: FileId,
}

impl InvalidateCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let plugin = LineChartPlugin::from_config(cli.load_plugin_config().await?)?;
        let removed = plugin.on_file_changed(self.datatype, self.file).await?;

        if removed == 0 {
            println!("No cached charts reference file {}", self.file);
        } else {
            println!(
                "{} Removed {} cached chart{} for file {}",
                "✓".green(),
                removed,
                if removed == 1 { "" } else { "s" },
                self.file
            );
        }
        Ok(())
    }
}
