//! Per-request chart page assembly.
//!
//! A [`ChartPage`] collects everything a request needs before anything is
//! rendered: the resolved field mapping, legend labels, record ranks, one
//! chart entry per record with an uploaded graph file, and the combined
//! chart over all of them. Building it runs every validation up front, so a
//! misconfigured datatype fails before any file is touched.

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::constants::USE_ROLLUP_OPTION;
use crate::core::ChartError;
use crate::identity::{CacheLayout, ChartKey, ChartTarget, chart_element_id};
use crate::legend::{LegendValues, resolve_legend};
use crate::mapping::{FieldBindings, ResolvedFields, resolve_fields};
use crate::models::{ChartFile, Datatype, DatatypeId, PluginOptions, RecordId, RecordSet};
use crate::render::{BuildJob, ChartDisplay, Series};
use crate::sorting::rank_records;

/// The chart of one record.
#[derive(Debug, Clone, Serialize)]
pub struct ChartEntry {
    pub record_id: RecordId,
    pub label: String,
    pub rank: usize,
    pub file: ChartFile,
    pub element_id: String,
    pub key: ChartKey,
}

/// The combined chart of every record with a graph file.
#[derive(Debug, Clone, Serialize)]
pub struct RollupEntry {
    pub label: String,
    pub element_id: String,
    pub key: ChartKey,
}

/// Everything rendered for one request.
#[derive(Debug, Clone)]
pub struct ChartPage {
    pub datatype_id: DatatypeId,
    pub fields: ResolvedFields,
    pub legend: LegendValues,
    pub ranks: BTreeMap<RecordId, usize>,
    /// Ordered by rank.
    pub charts: Vec<ChartEntry>,
    /// `None` when no record has a graph file.
    pub rollup: Option<RollupEntry>,
    pub display: ChartDisplay,
    pub use_rollup: bool,
    pub theme: String,
}

impl ChartPage {
    /// Resolve and validate a request's inputs.
    ///
    /// # Errors
    ///
    /// - [`ChartError::ConfigurationError`] for unbound or unknown roles
    /// - [`ChartError::UnsupportedFieldType`] for a pivot field legends cannot use
    /// - [`ChartError::MultipleUploads`] when a record holds several graph files
    pub fn assemble(
        datatype: &Datatype,
        record_set: &RecordSet,
        bindings: &FieldBindings,
        options: &PluginOptions,
        theme: &str,
    ) -> Result<Self, ChartError> {
        let fields = resolve_fields(bindings, &datatype.fields)?;
        let graph_field = fields.graph_file()?.id;
        let legend = resolve_legend(&record_set.records, fields.pivot_field()?)?;
        let ranks = rank_records(&record_set.records, record_set.sort_type);
        let stamp = options.last_changed_stamp();

        let mut charts = Vec::new();
        for record in &record_set.records {
            let Some(file) = record.single_file(graph_field)? else {
                debug!(record_id = %record.id, "Record has no graph file, skipping");
                continue;
            };
            charts.push(ChartEntry {
                record_id: record.id.clone(),
                label: legend.get(&record.id).unwrap_or_default().to_string(),
                rank: ranks.get(&record.id).copied().unwrap_or_default(),
                file: file.clone(),
                element_id: chart_element_id(),
                key: ChartKey::for_file(file.id, stamp),
            });
        }
        charts.sort_by_key(|chart| chart.rank);

        let rollup = (!charts.is_empty()).then(|| RollupEntry {
            label: legend.rollup().to_string(),
            element_id: chart_element_id(),
            key: ChartKey::for_rollup(charts.iter().map(|c| c.file.id), stamp),
        });

        Ok(Self {
            datatype_id: datatype.id,
            fields,
            legend,
            ranks,
            charts,
            rollup,
            display: ChartDisplay::from_options(options),
            use_rollup: options.is_enabled(USE_ROLLUP_OPTION),
            theme: theme.to_string(),
        })
    }

    pub fn entry(&self, record_id: &str) -> Option<&ChartEntry> {
        self.charts.iter().find(|chart| chart.record_id == record_id)
    }

    /// The build of `target`.
    ///
    /// # Errors
    ///
    /// [`ChartError::TargetNotSpecified`] when the target has nothing to draw.
    pub fn build_job(&self, target: &ChartTarget) -> Result<BuildJob, ChartError> {
        let (key, title, series) = match target {
            ChartTarget::Record(record_id) => {
                let chart = self.entry(record_id).ok_or_else(|| ChartError::TargetNotSpecified {
                    reason: if self.ranks.contains_key(record_id) {
                        format!("record '{record_id}' has no uploaded graph file")
                    } else {
                        format!("record '{record_id}' is not part of the record set")
                    },
                })?;
                (chart.key.clone(), chart.label.clone(), vec![series_of(chart)])
            }
            ChartTarget::Rollup => {
                let rollup = self.rollup.as_ref().ok_or_else(|| ChartError::TargetNotSpecified {
                    reason: "no record has an uploaded graph file to combine".to_string(),
                })?;
                (rollup.key.clone(), rollup.label.clone(), self.charts.iter().map(series_of).collect())
            }
        };

        Ok(BuildJob {
            datatype_id: self.datatype_id,
            key,
            title,
            series,
            display: self.display.clone(),
            theme: self.theme.clone(),
        })
    }

    /// Context of the embeddable fragment.
    ///
    /// `file_url` maps a path below the web root to its public URL.
    pub fn fragment_context(
        &self,
        layout: &CacheLayout,
        file_url: impl Fn(&Path) -> Option<String>,
        chart_script_url: &str,
    ) -> Value {
        let series_json = |chart: &ChartEntry| {
            json!({
                "file_id": chart.file.id,
                "label": chart.label,
                "rank": chart.rank,
                "data_url": file_url(&chart.file.local_path),
            })
        };

        let charts: Vec<Value> = self
            .charts
            .iter()
            .map(|chart| {
                json!({
                    "record_id": chart.record_id,
                    "label": chart.label,
                    "rank": chart.rank,
                    "element_id": chart.element_id,
                    "series": [series_json(chart)],
                    "svg_url": file_url(&layout.artifact_path(self.datatype_id, &chart.key)),
                })
            })
            .collect();

        let rollup = self.rollup.as_ref().map(|rollup| {
            json!({
                "label": rollup.label,
                "element_id": rollup.element_id,
                "series": self.charts.iter().map(&series_json).collect::<Vec<_>>(),
                "svg_url": file_url(&layout.artifact_path(self.datatype_id, &rollup.key)),
            })
        });

        json!({
            "datatype_id": self.datatype_id,
            "theme": self.theme,
            "chart_script_url": chart_script_url,
            "display": self.display,
            "legend": self.legend,
            "charts": charts,
            "show_rollup": self.use_rollup && rollup.is_some(),
            "rollup": rollup,
        })
    }
}

fn series_of(chart: &ChartEntry) -> Series {
    Series {
        file: chart.file.clone(),
        label: chart.label.clone(),
        rank: chart.rank,
    }
}
