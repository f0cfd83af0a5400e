//! Legend labels for charted records.
//!
//! Each record's label comes from its value in the pivot field. Which storage
//! representation holds that value depends on the pivot field's type-class;
//! only integer and text classes can produce a label.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::{ROLLUP_KEY, ROLLUP_LABEL};
use crate::core::ChartError;
use crate::models::{FieldDescriptor, FieldValue, Record, TypeClass};

/// Record id (plus the `rollup` sentinel) → display label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LegendValues(BTreeMap<String, String>);

impl LegendValues {
    pub fn get(&self, record_id: &str) -> Option<&str> {
        self.0.get(record_id).map(String::as_str)
    }

    /// Label of the combined chart.
    pub fn rollup(&self) -> &str {
        self.get(ROLLUP_KEY).unwrap_or(ROLLUP_LABEL)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build the legend for `records` from the pivot field.
///
/// A record with no pivot value is labelled with the pivot field's id. The
/// `rollup` entry is always present.
///
/// # Errors
///
/// [`ChartError::UnsupportedFieldType`] when the pivot field's type-class is
/// not integer or text.
pub fn resolve_legend(
    records: &[Record],
    pivot: &FieldDescriptor,
) -> Result<LegendValues, ChartError> {
    match pivot.type_class {
        TypeClass::Integer | TypeClass::ShortText | TypeClass::MediumText | TypeClass::LongText => {}
        TypeClass::Decimal | TypeClass::DateTime | TypeClass::File | TypeClass::Image => {
            return Err(ChartError::UnsupportedFieldType {
                field: pivot.name.clone(),
                type_class: pivot.type_class.to_string(),
            });
        }
    }

    let mut labels = BTreeMap::new();
    for record in records {
        let label = match record.values.get(&pivot.id) {
            Some(value) => pivot_label(value),
            None => pivot.id.to_string(),
        };
        labels.insert(record.id.clone(), label);
    }
    labels.insert(ROLLUP_KEY.to_string(), ROLLUP_LABEL.to_string());

    debug!(pivot = %pivot.name, entries = labels.len(), "Resolved legend");
    Ok(LegendValues(labels))
}

fn pivot_label(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(v) => v.to_string(),
        FieldValue::ShortText(v) | FieldValue::MediumText(v) | FieldValue::LongText(v) => {
            v.clone()
        }
        // Stored under a representation other than the declared one
        other => other.to_string(),
    }
}
