//! Error handling for linegraph
//!
//! This module provides the strongly-typed error enum used across the chart
//! pipeline and user-friendly error reporting for the CLI. The error system
//! follows two principles:
//! 1. **Strongly-typed errors** so callers can match on the failure mode
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`ChartError`] - Enumerated error types for every failure the plugin raises
//! - [`ErrorContext`] - Wrapper that adds details and a suggestion for display
//!
//! Library code returns [`anyhow::Result`] and raises [`ChartError`] values with
//! `?`, so the original variant is recoverable with
//! `error.downcast_ref::<ChartError>()`. No variant is retried or recovered
//! locally; every error surfaces to the immediate caller.
//!
//! # Examples
//!
//! ```rust,no_run
//! use linegraph::core::{ChartError, user_friendly_error};
//!
//! fn build() -> anyhow::Result<()> {
//!     Err(ChartError::TargetNotSpecified {
//!         reason: "no target was given".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = build() {
//!     user_friendly_error(e).display();
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::models::FieldId;

/// The main error type for chart operations
///
/// # Error Categories
///
/// ## Plugin configuration
/// - [`ConfigurationError`] - A required field role is unmapped or points at an unknown field
/// - [`UnsupportedFieldType`] - The pivot field's value-type cannot produce a legend
///
/// ## Record data
/// - [`MultipleUploads`] - More than one file uploaded to a single-file field
///
/// ## Build pipeline
/// - [`TargetNotSpecified`] - A build was requested without a usable chart target
/// - [`RenderFailed`] - The render service produced no artifact
/// - [`NetworkError`] - The render service could not be reached
/// - [`TemplateError`] - The chart page or fragment failed to render
/// - [`DecryptFailed`] - No plaintext could be produced for an uploaded file
///
/// ## Environment
/// - [`ConfigFileError`] - The plugin configuration file is unreadable
///
/// [`ConfigurationError`]: ChartError::ConfigurationError
/// [`UnsupportedFieldType`]: ChartError::UnsupportedFieldType
/// [`MultipleUploads`]: ChartError::MultipleUploads
/// [`TargetNotSpecified`]: ChartError::TargetNotSpecified
/// [`RenderFailed`]: ChartError::RenderFailed
/// [`NetworkError`]: ChartError::NetworkError
/// [`TemplateError`]: ChartError::TemplateError
/// [`DecryptFailed`]: ChartError::DecryptFailed
/// [`ConfigFileError`]: ChartError::ConfigFileError
#[derive(Error, Debug)]
pub enum ChartError {
    /// A plugin role could not be resolved to a field of the datatype
    #[error("Configuration error: field mapping for role '{role}' {reason}")]
    ConfigurationError {
        /// Role name, e.g. `pivot_field`
        role: String,
        /// Field id the role is bound to, when there is a binding at all
        field_id: Option<FieldId>,
        /// What is wrong with the binding
        reason: String,
    },

    /// The pivot field stores its value in a representation legends cannot use
    #[error("Unsupported field type '{type_class}' for legend field '{field}'")]
    UnsupportedFieldType {
        /// Field name
        field: String,
        /// Declared value-type-class
        type_class: String,
    },

    /// A single-file field holds more than one upload
    #[error("Record '{record_id}' has {count} files uploaded to single-file field {field_id}")]
    MultipleUploads {
        /// Record owning the uploads
        record_id: String,
        /// Field the files were uploaded to
        field_id: FieldId,
        /// Number of uploads found
        count: usize,
    },

    /// A build was requested but no record or rollup chart was identified
    #[error("No chart target specified: {reason}")]
    TargetNotSpecified {
        /// Why the target could not be determined
        reason: String,
    },

    /// The render service did not produce the expected output
    #[error("Failed to render chart '...{path_suffix}': {reason}")]
    RenderFailed {
        /// Last characters of the intended output path
        path_suffix: String,
        /// Failure description
        reason: String,
    },

    /// The render service could not be reached
    #[error("Network error: {operation}: {reason}")]
    NetworkError {
        /// Operation being performed
        operation: String,
        /// Underlying failure
        reason: String,
    },

    /// Chart page or fragment rendering failed
    #[error("Template error in '{template}': {message}")]
    TemplateError {
        /// Template name
        template: String,
        /// Tera error chain
        message: String,
    },

    /// A plaintext copy of an uploaded file could not be produced
    #[error("Failed to decrypt file {file_id}: {reason}")]
    DecryptFailed {
        /// File being decrypted
        file_id: u64,
        /// Failure description
        reason: String,
    },

    /// Plugin configuration file problems
    #[error("Invalid configuration file {path}: {reason}")]
    ConfigFileError {
        /// Configuration file path
        path: String,
        /// Failure description
        reason: String,
    },

    /// Generic error for cases not covered by specific variants
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for ChartError {
    fn clone(&self) -> Self {
        match self {
            Self::ConfigurationError {
                role,
                field_id,
                reason,
            } => Self::ConfigurationError {
                role: role.clone(),
                field_id: *field_id,
                reason: reason.clone(),
            },
            Self::UnsupportedFieldType {
                field,
                type_class,
            } => Self::UnsupportedFieldType {
                field: field.clone(),
                type_class: type_class.clone(),
            },
            Self::MultipleUploads {
                record_id,
                field_id,
                count,
            } => Self::MultipleUploads {
                record_id: record_id.clone(),
                field_id: *field_id,
                count: *count,
            },
            Self::TargetNotSpecified {
                reason,
            } => Self::TargetNotSpecified {
                reason: reason.clone(),
            },
            Self::RenderFailed {
                path_suffix,
                reason,
            } => Self::RenderFailed {
                path_suffix: path_suffix.clone(),
                reason: reason.clone(),
            },
            Self::NetworkError {
                operation,
                reason,
            } => Self::NetworkError {
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::TemplateError {
                template,
                message,
            } => Self::TemplateError {
                template: template.clone(),
                message: message.clone(),
            },
            Self::DecryptFailed {
                file_id,
                reason,
            } => Self::DecryptFailed {
                file_id: *file_id,
                reason: reason.clone(),
            },
            Self::ConfigFileError {
                path,
                reason,
            } => Self::ConfigFileError {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying display details and an actionable suggestion
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ChartError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details
    #[must_use]
    pub const fn new(error: ChartError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// [`ChartError`] values anywhere in the chain get a tailored suggestion;
/// everything else is reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(chart_error) = error.chain().find_map(|e| e.downcast_ref::<ChartError>()) {
        return create_error_context(chart_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(ChartError::Other {
                    message: error_with_chain(&error),
                })
                .with_suggestion("Check ownership of the web root and the graph cache directory")
                .with_details("The cache directory must be writable by the user running linegraph");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(ChartError::Other {
                    message: error_with_chain(&error),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(ChartError::ConfigFileError {
            path: "config.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the linegraph configuration file");
    }

    ErrorContext::new(ChartError::Other {
        message: error_with_chain(&error),
    })
}

fn error_with_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();

    let chain: Vec<String> = error
        .chain()
        .skip(1) // Skip the root cause which is already in to_string()
        .map(std::string::ToString::to_string)
        .collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    message
}

fn create_error_context(error: ChartError) -> ErrorContext {
    match &error {
        ChartError::ConfigurationError { role, .. } => {
            let suggestion = format!(
                "Bind the '{role}' role to a field that exists in this datatype in the plugin settings"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Every role the line chart plugin requires must map to exactly one field")
        }

        ChartError::UnsupportedFieldType { .. } => ErrorContext::new(error)
            .with_suggestion("Map the pivot field to an integer or text field")
            .with_details("Legends can be built from integer, short, medium and long text fields only"),

        ChartError::MultipleUploads { .. } => ErrorContext::new(error)
            .with_suggestion("Remove the extra uploads so the graph file field holds a single file"),

        ChartError::TargetNotSpecified { .. } => ErrorContext::new(error)
            .with_suggestion("Pass a record id with an uploaded graph file, or 'rollup' for the combined chart"),

        ChartError::RenderFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the render service is running and can load the chart page URL")
            .with_details("The render service must write the SVG to the requested output path before responding"),

        ChartError::NetworkError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the [render_service] host and port in the linegraph configuration"),

        ChartError::DecryptFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check the decrypt_command setting and that the file still exists"),

        ChartError::ConfigFileError { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'linegraph config init' to generate a valid configuration file"),

        _ => ErrorContext::new(error),
    }
}
