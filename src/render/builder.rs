//! Building chart artifacts on a cache miss.
//!
//! One build runs these steps, all scoped to the call:
//!
//! 1. make the plaintext of every contributing file available
//! 2. render the chart page and write it below the web root
//! 3. ask the render service to snapshot the chart element to a private path
//! 4. fix the SVG attribute casing the renderer lowercases
//! 5. write the result to the cache path
//!
//! The intermediate page, the raw renderer output and plaintexts decrypted
//! for non-public files are deleted when the build returns, whatever the
//! outcome. Nothing is retried.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PluginConfig;
use crate::constants::{
    DEFAULT_GRAPH_HEIGHT, DEFAULT_GRAPH_WIDTH, DIAGNOSTIC_PATH_CHARS, SVG_EXTENSION,
};
use crate::core::ChartError;
use crate::identity::{CacheLayout, ChartKey, chart_element_id};
use crate::models::{ChartFile, DatatypeId, PluginOptions};
use crate::render::decrypt::{Decryptor, PlaintextRegistry};
use crate::render::guard::TransientFile;
use crate::render::service::{RenderRequest, RenderService};
use crate::render::template::{ChartTemplate, TemplateEngine};
use crate::utils::fs::atomic_write_async;

/// Size and captions of a chart, from the plugin options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartDisplay {
    pub width: u32,
    pub height: u32,
    pub x_axis_caption: String,
    pub y_axis_caption: String,
}

impl ChartDisplay {
    pub fn from_options(options: &PluginOptions) -> Self {
        Self {
            width: options.dimension("graph_width", DEFAULT_GRAPH_WIDTH),
            height: options.dimension("graph_height", DEFAULT_GRAPH_HEIGHT),
            x_axis_caption: options.get("x_axis_caption").unwrap_or_default().to_string(),
            y_axis_caption: options.get("y_axis_caption").unwrap_or_default().to_string(),
        }
    }
}

impl Default for ChartDisplay {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRAPH_WIDTH,
            height: DEFAULT_GRAPH_HEIGHT,
            x_axis_caption: String::new(),
            y_axis_caption: String::new(),
        }
    }
}

/// One line of a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    pub file: ChartFile,
    pub label: String,
    pub rank: usize,
}

/// Everything needed to draw one chart artifact.
#[derive(Debug, Clone)]
pub struct BuildJob {
    pub datatype_id: DatatypeId,
    pub key: ChartKey,
    pub title: String,
    pub series: Vec<Series>,
    pub display: ChartDisplay,
    pub theme: String,
}

/// Builds chart artifacts through the render service.
#[derive(Clone)]
pub struct ArtifactBuilder {
    config: Arc<PluginConfig>,
    layout: CacheLayout,
    render_service: Arc<dyn RenderService>,
    decryptor: Arc<dyn Decryptor>,
    plaintexts: PlaintextRegistry,
    templates: Arc<dyn TemplateEngine>,
}

impl ArtifactBuilder {
    pub fn new(
        config: Arc<PluginConfig>,
        render_service: Arc<dyn RenderService>,
        decryptor: Arc<dyn Decryptor>,
        templates: Arc<dyn TemplateEngine>,
    ) -> Self {
        let layout = CacheLayout::new(&config.web_root);
        Self {
            config,
            layout,
            render_service,
            decryptor,
            plaintexts: PlaintextRegistry::new(),
            templates,
        }
    }

    /// Plaintexts claimed by builds in progress.
    pub fn plaintexts(&self) -> &PlaintextRegistry {
        &self.plaintexts
    }

    /// Public URL of a file below the web root.
    pub fn file_url(&self, path: &Path) -> Option<String> {
        self.layout.url_path(path).map(|url_path| self.config.public_url(&url_path))
    }

    /// Build `job` and write the artifact to `output`.
    ///
    /// # Errors
    ///
    /// [`ChartError::RenderFailed`] when the render service fails, times out
    /// or produces no output; decrypt and template errors as raised.
    pub async fn build(&self, job: &BuildJob, output: &Path) -> Result<()> {
        let started = std::time::Instant::now();
        let files: Vec<ChartFile> = job.series.iter().map(|s| s.file.clone()).collect();
        let plaintexts =
            self.plaintexts.materialize_all(self.decryptor.as_ref(), &files, Utc::now()).await?;

        let series: Vec<_> = job
            .series
            .iter()
            .zip(&plaintexts)
            .map(|(series, plaintext)| {
                json!({
                    "file_id": series.file.id,
                    "label": series.label,
                    "rank": series.rank,
                    "data_url": self.file_url(plaintext.path())
                        .unwrap_or_else(|| format!("file://{}", plaintext.path().display())),
                })
            })
            .collect();

        let element_id = chart_element_id();
        let context = json!({
            "title": job.title,
            "element_id": element_id,
            "theme": job.theme,
            "chart_script_url": self.config.chart_script_url,
            "display": job.display,
            "series": series,
        });
        let html = self.templates.render(ChartTemplate::Page, &context)?;

        let page = TransientFile::new(self.layout.page_path(job.datatype_id, &job.key));
        if let Some(parent) = page.path().parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create chart cache directory: {}", parent.display())
            })?;
        }
        tokio::fs::write(page.path(), html)
            .await
            .with_context(|| format!("Failed to write chart page: {}", page.path().display()))?;

        tokio::fs::create_dir_all(&self.config.scratch_dir).await.with_context(|| {
            format!("Failed to create scratch directory: {}", self.config.scratch_dir.display())
        })?;
        let raw = TransientFile::new(
            self.config.scratch_dir.join(format!("{}.{SVG_EXTENSION}", Uuid::new_v4().simple())),
        );

        let url = self
            .file_url(page.path())
            .ok_or_else(|| render_failed(output, "chart page is outside the web root"))?;
        let request = RenderRequest {
            url,
            selector: element_id,
            output: raw.path().to_path_buf(),
        };
        let timeout = self.config.render_service.timeout();
        match tokio::time::timeout(timeout, self.render_service.render(&request)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(render_failed(output, &format!("{e:#}")).into()),
            Err(_) => {
                return Err(render_failed(output, &format!("render call timed out after {timeout:?}"))
                    .into());
            }
        }

        if !self.wait_for_output(raw.path()).await {
            return Err(render_failed(output, "renderer produced no output").into());
        }

        let svg = tokio::fs::read_to_string(raw.path())
            .await
            .with_context(|| format!("Failed to read renderer output: {}", raw.path().display()))?;
        atomic_write_async(output.to_path_buf(), fix_svg_casing(&svg).into_bytes()).await?;

        info!(
            path = %output.display(),
            files = plaintexts.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Built chart"
        );
        Ok(())
    }

    async fn wait_for_output(&self, path: &Path) -> bool {
        let attempts = self.config.render_service.poll_attempts.max(1);
        for attempt in 0..attempts {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                return true;
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(self.config.render_service.poll_interval()).await;
            }
        }
        debug!(path = %path.display(), attempts, "Renderer output never appeared");
        false
    }
}

fn render_failed(output: &Path, reason: &str) -> ChartError {
    ChartError::RenderFailed {
        path_suffix: truncate_for_diagnostics(output),
        reason: reason.to_string(),
    }
}

/// Restore the camel-case `viewBox` and `preserveAspectRatio` attributes.
///
/// Every occurrence of the lowercased names is replaced, wherever it appears.
pub fn fix_svg_casing(svg: &str) -> String {
    svg.replace("viewbox", "viewBox").replace("preserveaspectratio", "preserveAspectRatio")
}

/// The last characters of `path`, for error messages.
pub fn truncate_for_diagnostics(path: &Path) -> String {
    let text = path.to_string_lossy();
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(DIAGNOSTIC_PATH_CHARS)).collect()
}
