//! Data models shared by every stage of the chart pipeline
//!
//! These are read-only views of the platform's entity model: the datatype
//! and its field catalog, the records being charted with their uploaded
//! files, and the plugin's options. They are supplied by the caller for the
//! duration of one request and never persisted by this crate.

pub mod field;
pub mod options;
pub mod record;

pub use field::{DatatypeId, FieldDescriptor, FieldId, FieldValue, TypeClass};
pub use options::{PluginOption, PluginOptions};
pub use record::{ChartFile, Datatype, FileId, Record, RecordId, RecordSet};
