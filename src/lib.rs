//! linegraph - line charts of uploaded data files
//!
//! A render plugin that draws line charts for records whose uploaded files
//! hold the plotted data. Charts are produced by an external headless
//! render service and cached as SVG files below the web root, so repeated
//! views of unchanged data never reach the renderer.
//!
//! # Architecture Overview
//!
//! A render call flows through these stages:
//!
//! 1. [`mapping`] resolves the datatype's field bindings to concrete fields
//! 2. [`legend`] and [`sorting`] compute each record's label and rank
//! 3. [`identity`] derives the cache file name of every chart
//! 4. [`cache`] returns a cached chart or coordinates a single build per key
//! 5. [`render`] builds the chart through the render service on a miss
//!
//! [`plugin`] ties the stages together behind the host's entry points, and
//! [`cache::purge_file`] drops cached charts when an upload changes.
//!
//! # Cache Layout
//!
//! ```text
//! <web_root>/uploads/files/graphs/datatype_<id>/
//! ├── Chart__<file_id>_<stamp>.svg                 # one record
//! ├── Chart__<file_id>_<file_id>_..._<stamp>.svg  # rollup over all records
//! └── .locks/                                     # build locks
//! ```
//!
//! The stamp is the last time an active plugin option changed, so editing
//! the chart settings retires every old name without deleting anything.
//!
//! # Modules
//!
//! - [`cache`] - cache lookups, build coordination and invalidation
//! - [`cli`] - the `linegraph` command line
//! - [`config`] - deployment configuration (`~/.linegraph/config.toml`)
//! - [`constants`] - defaults and limits
//! - [`core`] - error types and user-facing error output
//! - [`identity`] - chart targets, cache keys and paths
//! - [`legend`] - legend labels
//! - [`mapping`] - field role bindings
//! - [`models`] - datatypes, records, files and plugin options
//! - [`plugin`] - the plugin entry points
//! - [`render`] - the artifact build pipeline
//! - [`sorting`] - chart ordering
//! - [`utils`] - filesystem helpers

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod identity;
pub mod legend;
pub mod mapping;
pub mod models;
pub mod plugin;
pub mod render;
pub mod sorting;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
