//! Fixtures for chart requests.

use chrono::{TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{PluginConfig, RenderServiceConfig};
use crate::identity::ChartTarget;
use crate::models::{
    ChartFile, Datatype, FieldDescriptor, FieldId, FieldValue, FileId, PluginOption, Record,
    RecordSet, TypeClass,
};
use crate::plugin::{ChartRequest, LineChartPlugin, RenderOptions};
use crate::render::{Decryptor, RenderService, TeraTemplateEngine};

/// Field id of the fixture's pivot (legend) field.
pub const PIVOT_FIELD: FieldId = 101;

/// Field id of the fixture's graph file field.
pub const GRAPH_FIELD: FieldId = 102;

/// Builder for a [`ChartRequest`] against a two-field datatype.
///
/// Uploaded files are placed at `<web_root>/uploads/files/File_<id>.csv`.
#[derive(Debug, Clone)]
pub struct RequestFixture {
    web_root: PathBuf,
    request: ChartRequest,
}

impl RequestFixture {
    pub fn new(web_root: &Path, datatype_id: u64) -> Self {
        let datatype = Datatype {
            id: datatype_id,
            fields: vec![
                FieldDescriptor {
                    id: PIVOT_FIELD,
                    name: "Sample Name".to_string(),
                    type_class: TypeClass::ShortText,
                },
                FieldDescriptor {
                    id: GRAPH_FIELD,
                    name: "Data File".to_string(),
                    type_class: TypeClass::File,
                },
            ],
        };

        Self {
            web_root: web_root.to_path_buf(),
            request: ChartRequest {
                datatype,
                record_set: RecordSet::default(),
                bindings: [
                    ("pivot_field".to_string(), PIVOT_FIELD),
                    ("graph_file".to_string(), GRAPH_FIELD),
                ]
                .into(),
                options: Vec::new(),
                theme: "default".to_string(),
                render: RenderOptions::default(),
            },
        }
    }

    /// Where the plaintext of `file_id` lives.
    pub fn file_path(&self, file_id: FileId) -> PathBuf {
        self.web_root.join("uploads/files").join(format!("File_{file_id}.csv"))
    }

    #[must_use]
    pub fn with_record(self, record_id: &str, label: &str, file_id: FileId) -> Self {
        self.with_record_files(record_id, label, &[file_id])
    }

    #[must_use]
    pub fn with_record_files(mut self, record_id: &str, label: &str, file_ids: &[FileId]) -> Self {
        let files = file_ids
            .iter()
            .map(|id| ChartFile {
                id: *id,
                local_path: self.file_path(*id),
                public_date: None,
            })
            .collect();

        let mut record = Record {
            id: record_id.to_string(),
            ..Default::default()
        };
        record.values.insert(PIVOT_FIELD, FieldValue::ShortText(label.to_string()));
        record.files.insert(GRAPH_FIELD, files);
        self.request.record_set.records.push(record);
        self
    }

    /// Add an option updated at `updated_micros` since the epoch.
    #[must_use]
    pub fn with_option(mut self, name: &str, value: &str, updated_micros: i64, active: bool) -> Self {
        self.request.options.push(PluginOption {
            name: name.to_string(),
            value: value.to_string(),
            active,
            updated: Utc.timestamp_micros(updated_micros).single().unwrap_or_default(),
        });
        self
    }

    #[must_use]
    pub fn with_binding(mut self, role: &str, field_id: FieldId) -> Self {
        self.request.bindings.insert(role.to_string(), field_id);
        self
    }

    /// Request the cached chart file of `target`.
    #[must_use]
    pub fn build_graph(mut self, target: Option<ChartTarget>) -> Self {
        self.request.render = RenderOptions {
            build_graph: true,
            target,
        };
        self
    }

    pub fn build(self) -> ChartRequest {
        self.request
    }
}

/// A plugin over `web_root` with fast polling and the given collaborators.
pub fn test_plugin(
    web_root: &Path,
    render_service: Arc<dyn RenderService>,
    decryptor: Arc<dyn Decryptor>,
) -> LineChartPlugin {
    let config = PluginConfig {
        web_root: web_root.to_path_buf(),
        site_base_url: "http://localhost".to_string(),
        scratch_dir: web_root.join("scratch"),
        lock_timeout_secs: 10,
        render_service: RenderServiceConfig {
            timeout_secs: 5,
            poll_attempts: 3,
            poll_interval_ms: 10,
            ..RenderServiceConfig::default()
        },
        ..PluginConfig::default()
    };
    LineChartPlugin::new(config, render_service, decryptor, Arc::new(TeraTemplateEngine::new()))
}
