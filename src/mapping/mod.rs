//! Resolution of plugin role bindings to concrete datatype fields.
//!
//! The plugin configuration binds logical roles (`graph_file`,
//! `pivot_field`) to field ids. Before anything is charted, every binding is
//! looked up in the datatype's field catalog; a role that is unbound, or bound
//! to a field the datatype does not define, fails with
//! [`ChartError::ConfigurationError`] naming the role.

use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::{GRAPH_FILE_ROLE, PIVOT_FIELD_ROLE, REQUIRED_ROLES};
use crate::core::ChartError;
use crate::models::{FieldDescriptor, FieldId};

/// Role name → bound field id, as stored in the plugin configuration.
pub type FieldBindings = BTreeMap<String, FieldId>;

/// Role name → field descriptor, after resolution against the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFields {
    fields: BTreeMap<String, FieldDescriptor>,
}

impl ResolvedFields {
    pub fn get(&self, role: &str) -> Option<&FieldDescriptor> {
        self.fields.get(role)
    }

    /// The field bound to `role`, or a configuration error.
    pub fn require(&self, role: &str) -> Result<&FieldDescriptor, ChartError> {
        self.fields.get(role).ok_or_else(|| ChartError::ConfigurationError {
            role: role.to_string(),
            field_id: None,
            reason: "is not configured".to_string(),
        })
    }

    pub fn graph_file(&self) -> Result<&FieldDescriptor, ChartError> {
        self.require(GRAPH_FILE_ROLE)
    }

    pub fn pivot_field(&self) -> Result<&FieldDescriptor, ChartError> {
        self.require(PIVOT_FIELD_ROLE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(role, field)| (role.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Resolve every configured role against the datatype's field catalog.
///
/// # Errors
///
/// [`ChartError::ConfigurationError`] when a required role has no binding or a
/// binding refers to a field id missing from `catalog`.
pub fn resolve_fields(
    bindings: &FieldBindings,
    catalog: &[FieldDescriptor],
) -> Result<ResolvedFields, ChartError> {
    for role in REQUIRED_ROLES {
        if !bindings.contains_key(role) {
            return Err(ChartError::ConfigurationError {
                role: role.to_string(),
                field_id: None,
                reason: "is not configured".to_string(),
            });
        }
    }

    let mut fields = BTreeMap::new();
    for (role, field_id) in bindings {
        let field = catalog.iter().find(|f| f.id == *field_id).ok_or_else(|| {
            ChartError::ConfigurationError {
                role: role.clone(),
                field_id: Some(*field_id),
                reason: format!("points at field {field_id}, which the datatype does not define"),
            }
        })?;
        debug!(role = %role, field_id = field.id, field = %field.name, "Resolved field mapping");
        fields.insert(role.clone(), field.clone());
    }

    Ok(ResolvedFields {
        fields,
    })
}
