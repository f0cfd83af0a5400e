//! The line chart plugin and its entry points.
//!
//! The host platform calls into [`LineChartPlugin`]:
//!
//! - [`render`](LineChartPlugin::render) for a record set, returning either
//!   the embeddable HTML fragment or the path of a cached chart file;
//! - [`on_file_changed`](LineChartPlugin::on_file_changed) when an upload is
//!   replaced or deleted;
//! - [`on_plugin_removed`](LineChartPlugin::on_plugin_removed) and
//!   [`on_settings_changed`](LineChartPlugin::on_settings_changed), which
//!   currently have nothing to do.
//!
//! # Examples
//!
//! ```rust,no_run
//! use linegraph::config::PluginConfig;
//! use linegraph::plugin::{ChartRequest, LineChartPlugin, RenderOutput};
//!
//! # async fn example(request: ChartRequest) -> anyhow::Result<()> {
//! let plugin = LineChartPlugin::from_config(PluginConfig::load_with_optional(None).await?)?;
//! match plugin.render(&request).await? {
//!     RenderOutput::Html(html) => println!("{html}"),
//!     RenderOutput::File(path) => println!("{}", path.display()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod page;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{ChartCache, cleanup_stale_locks, purge_file};
use crate::config::PluginConfig;
use crate::constants::STALE_LOCK_TTL_SECS;
use crate::core::ChartError;
use crate::identity::{CacheLayout, ChartTarget};
use crate::mapping::FieldBindings;
use crate::models::{Datatype, DatatypeId, FileId, PluginOption, PluginOptions, RecordSet};
use crate::render::{
    ArtifactBuilder, ChartTemplate, CommandDecryptor, Decryptor, HttpRenderService, NoDecryptor,
    PlaintextRegistry, RenderService, TemplateEngine, TeraTemplateEngine,
};

pub use page::{ChartEntry, ChartPage, RollupEntry};

/// One render call from the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRequest {
    pub datatype: Datatype,
    #[serde(default)]
    pub record_set: RecordSet,
    /// Role → field id, from the plugin's settings for this datatype.
    pub bindings: FieldBindings,
    /// Stored plugin options, active or not.
    #[serde(default)]
    pub options: Vec<PluginOption>,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub render: RenderOptions,
}

fn default_theme() -> String {
    "default".to_string()
}

/// What to produce.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Return a cached chart file instead of the HTML fragment.
    #[serde(default)]
    pub build_graph: bool,
    /// Chart to build; required when `build_graph` is set.
    #[serde(default)]
    pub target: Option<ChartTarget>,
}

/// Result of [`LineChartPlugin::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    Html(String),
    File(PathBuf),
}

/// The line chart render plugin.
#[derive(Clone)]
pub struct LineChartPlugin {
    config: Arc<PluginConfig>,
    cache: ChartCache,
    builder: ArtifactBuilder,
    templates: Arc<dyn TemplateEngine>,
}

impl LineChartPlugin {
    pub fn new(
        config: PluginConfig,
        render_service: Arc<dyn RenderService>,
        decryptor: Arc<dyn Decryptor>,
        templates: Arc<dyn TemplateEngine>,
    ) -> Self {
        let config = Arc::new(config);
        let cache = ChartCache::new(CacheLayout::new(&config.web_root))
            .with_lock_timeout(config.lock_timeout());
        let builder = ArtifactBuilder::new(
            Arc::clone(&config),
            render_service,
            decryptor,
            Arc::clone(&templates),
        );
        Self {
            config,
            cache,
            builder,
            templates,
        }
    }

    /// Plugin talking to the configured render service over HTTP.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client or the decrypt command is invalid.
    pub fn from_config(config: PluginConfig) -> Result<Self> {
        let render_service = Arc::new(HttpRenderService::new(&config.render_service)?);
        let decryptor: Arc<dyn Decryptor> = match &config.decrypt_command {
            Some(argv) => Arc::new(CommandDecryptor::new(argv.clone())?),
            None => Arc::new(NoDecryptor),
        };
        Ok(Self::new(config, render_service, decryptor, Arc::new(TeraTemplateEngine::new())))
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn cache(&self) -> &ChartCache {
        &self.cache
    }

    /// Plaintexts currently held open by builds of this plugin.
    pub fn plaintexts(&self) -> &PlaintextRegistry {
        self.builder.plaintexts()
    }

    /// Render a record set.
    ///
    /// With `build_graph` set, returns the cached chart file for the
    /// requested target, building it first on a miss. Otherwise returns the
    /// HTML fragment for the whole record set.
    ///
    /// # Errors
    ///
    /// Configuration, legend and upload errors from page assembly;
    /// [`ChartError::TargetNotSpecified`] for a build without a usable
    /// target; [`ChartError::RenderFailed`] when the build fails.
    pub async fn render(&self, request: &ChartRequest) -> Result<RenderOutput> {
        let options = PluginOptions::from_options(&request.options);
        let page = ChartPage::assemble(
            &request.datatype,
            &request.record_set,
            &request.bindings,
            &options,
            &request.theme,
        )?;
        debug!(
            datatype_id = request.datatype.id,
            charts = page.charts.len(),
            last_changed = options.last_changed_stamp(),
            "Assembled chart page"
        );

        if !request.render.build_graph {
            let layout = self.cache.layout();
            let context = page.fragment_context(
                layout,
                |path| self.builder.file_url(path),
                &self.config.chart_script_url,
            );
            let html = self.templates.render(ChartTemplate::Fragment, &context)?;
            return Ok(RenderOutput::Html(html));
        }

        let target = request.render.target.as_ref().ok_or_else(|| ChartError::TargetNotSpecified {
            reason: "a chart file was requested without a record id or 'rollup'".to_string(),
        })?;
        let job = page.build_job(target)?;

        let builder = &self.builder;
        let job_ref = &job;
        let outcome = self
            .cache
            .get_or_build(job.datatype_id, &job.key, |path| async move {
                builder.build(job_ref, &path).await
            })
            .await?;

        Ok(RenderOutput::File(outcome.into_path()))
    }

    /// Purge every cached chart drawn from `file_id`.
    ///
    /// Returns the number of cached files removed.
    pub async fn on_file_changed(&self, datatype_id: DatatypeId, file_id: FileId) -> Result<usize> {
        let removed = purge_file(self.cache.layout(), datatype_id, file_id).await?;
        let swept = cleanup_stale_locks(
            &self.cache.layout().locks_dir(datatype_id),
            STALE_LOCK_TTL_SECS,
        )
        .await?;
        if swept > 0 {
            info!(datatype_id, swept, "Removed stale build locks");
        }
        Ok(removed)
    }

    pub fn on_plugin_removed(&self, datatype_id: DatatypeId) {
        debug!(datatype_id, "Plugin removed from datatype, nothing to clean up");
    }

    pub fn on_settings_changed(&self, datatype_id: DatatypeId) {
        // Option edits move the last-changed stamp, which retires old cache names
        debug!(datatype_id, "Plugin settings changed, nothing to invalidate");
    }
}
