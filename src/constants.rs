//! Global constants used throughout the linegraph codebase.
//!
//! This module contains timeout durations, retry parameters, cache layout
//! names and other values that are used across multiple modules. Defining
//! them centrally keeps the on-disk naming scheme in one place.

use std::time::Duration;

/// Default timeout for the external render call (60 seconds).
///
/// The render service has no timeout of its own; a hung renderer would
/// otherwise block the request indefinitely.
pub fn default_render_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Default timeout for acquiring a per-chart build lock (120 seconds).
///
/// Must be at least as long as a single render so that a waiter can outlast
/// the builder it is waiting on. Set to 2× the render timeout.
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for exponential backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// How many times the renderer's raw output is checked for after the call returns.
pub const OUTPUT_POLL_ATTEMPTS: u32 = 10;

/// Delay between two raw-output checks (100ms).
pub const OUTPUT_POLL_INTERVAL_MS: u64 = 100;

/// Host of the render service.
pub const DEFAULT_RENDER_HOST: &str = "127.0.0.1";

/// Port of the render service.
pub const DEFAULT_RENDER_PORT: u16 = 9494;

/// Lock files older than this are considered abandoned (1 hour).
pub const STALE_LOCK_TTL_SECS: u64 = 3600;

/// Graph cache root, relative to the web root.
pub const GRAPHS_SUBDIR: &str = "uploads/files/graphs";

/// Prefix of the per-datatype cache directory (`datatype_<id>`).
pub const DATATYPE_DIR_PREFIX: &str = "datatype_";

/// Name of the lock directory inside a datatype cache directory.
pub const LOCKS_DIR: &str = ".locks";

/// Prefix of every cached chart artifact.
pub const CHART_FILE_PREFIX: &str = "Chart__";

/// Extension of the final chart artifact.
pub const SVG_EXTENSION: &str = "svg";

/// Extension of the intermediate chart page.
pub const HTML_EXTENSION: &str = "html";

/// Prefix of generated chart element ids.
pub const CHART_ELEMENT_PREFIX: &str = "Chart_";

/// Legend key of the combined chart.
pub const ROLLUP_KEY: &str = "rollup";

/// Legend label of the combined chart.
pub const ROLLUP_LABEL: &str = "Combined Chart";

/// Role bound to the uploaded data file field.
pub const GRAPH_FILE_ROLE: &str = "graph_file";

/// Role bound to the field providing legend labels.
pub const PIVOT_FIELD_ROLE: &str = "pivot_field";

/// Roles every plugin configuration must bind.
pub const REQUIRED_ROLES: [&str; 2] = [GRAPH_FILE_ROLE, PIVOT_FIELD_ROLE];

/// Number of trailing path characters quoted in render failures.
pub const DIAGNOSTIC_PATH_CHARS: usize = 40;

/// Plugin option toggling the combined chart.
pub const USE_ROLLUP_OPTION: &str = "use_rollup";

/// Chart width used when `graph_width` is not set.
pub const DEFAULT_GRAPH_WIDTH: u32 = 900;

/// Chart height used when `graph_height` is not set.
pub const DEFAULT_GRAPH_HEIGHT: u32 = 400;
