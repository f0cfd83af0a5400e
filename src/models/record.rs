//! Records, record sets and the data files uploaded to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::field::{DatatypeId, FieldDescriptor, FieldId, FieldValue, TypeClass};
use crate::core::ChartError;

/// Identifier of a record. Usually a string of digits, but not guaranteed
/// to be sequential.
pub type RecordId = String;

/// Identifier of an uploaded file.
pub type FileId = u64;

/// An uploaded data file feeding a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartFile {
    pub id: FileId,
    /// Where the plaintext copy of the file lives (or will live once decrypted).
    pub local_path: PathBuf,
    /// When the file becomes public. `None` means it is not scheduled to.
    #[serde(default)]
    pub public_date: Option<DateTime<Utc>>,
}

impl ChartFile {
    /// Whether the file is public at `now`.
    pub fn is_public_at(&self, now: DateTime<Utc>) -> bool {
        self.public_date.is_some_and(|date| date <= now)
    }
}

/// A single record of a datatype.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Raw value of the datatype's sort field.
    #[serde(default)]
    pub sort_value: Option<String>,
    #[serde(default)]
    pub values: HashMap<FieldId, FieldValue>,
    #[serde(default)]
    pub files: HashMap<FieldId, Vec<ChartFile>>,
}

impl Record {
    /// The file uploaded to a single-file field, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::MultipleUploads`] when the field holds more than one file.
    pub fn single_file(&self, field_id: FieldId) -> Result<Option<&ChartFile>, ChartError> {
        match self.files.get(&field_id).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([file]) => Ok(Some(file)),
            Some(files) => Err(ChartError::MultipleUploads {
                record_id: self.id.clone(),
                field_id,
                count: files.len(),
            }),
        }
    }
}

/// The ordered records to chart, plus the type-class of their shared sort field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    /// `None` when the datatype has no sort field; records then sort by id.
    #[serde(default, deserialize_with = "super::field::deserialize_optional_type_class")]
    pub sort_type: Option<TypeClass>,
    #[serde(default)]
    pub records: Vec<Record>,
}

/// The datatype the records belong to, with its field catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Datatype {
    pub id: DatatypeId,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}
