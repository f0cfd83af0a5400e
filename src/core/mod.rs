//! Core types for linegraph
//!
//! This module holds the error taxonomy shared by every stage of the chart
//! pipeline together with the helpers that turn errors into CLI output.
//!
//! # Modules
//!
//! ## `error` - Error Handling
//!
//! - [`ChartError`] - Enumerated failure modes of the plugin
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format

pub mod error;

pub use error::{ChartError, ErrorContext, user_friendly_error};
