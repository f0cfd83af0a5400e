//! Render a chart request from a JSON file.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

use super::CliConfig;
use crate::identity::ChartTarget;
use crate::plugin::{ChartRequest, LineChartPlugin, RenderOutput};

/// Render a chart request.
///
/// The request file holds a serialized [`ChartRequest`]. Without `--build`
/// the HTML fragment is printed; with it, the chart for `--target` is built
/// (or taken from the cache) and its path is printed.
#[derive(Args)]
pub struct RenderCommand {
    /// JSON file with the chart request
    #[arg(long, value_name = "FILE")]
    request: PathBuf,

    /// Build the chart file instead of printing the HTML fragment
    #[arg(long)]
    build: bool,

    /// Record id to chart, or `rollup` for the combined chart
    #[arg(long, value_name = "RECORD_ID|rollup")]
    target: Option<ChartTarget>,
}

impl RenderCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let content = tokio::fs::read_to_string(&self.request)
            .await
            .with_context(|| format!("Failed to read chart request {}", self.request.display()))?;
        let mut request: ChartRequest = serde_json::from_str(&content)
            .with_context(|| format!("Invalid chart request {}", self.request.display()))?;

        if self.build {
            request.render.build_graph = true;
        }
        if self.target.is_some() {
            request.render.target = self.target;
        }
        debug!(
            datatype_id = request.datatype.id,
            records = request.record_set.records.len(),
            build = request.render.build_graph,
            "Loaded chart request"
        );

        let plugin = LineChartPlugin::from_config(cli.load_plugin_config().await?)?;
        match plugin.render(&request).await? {
            RenderOutput::Html(html) => println!("{html}"),
            RenderOutput::File(path) => println!("{}", path.display()),
        }
        Ok(())
    }
}
