//! Test utilities for linegraph
//!
//! Helpers shared by unit and integration tests:
//! - one-time tracing setup for test output
//! - in-process fakes of the render service and decryptor
//! - fixtures for datatypes, record sets and chart requests
//!
//! # Example
//!
//! ```rust,no_run
//! use linegraph::test_utils::{FakeRenderService, RequestFixture, init_test_logging};
//!
//! # async fn example() -> anyhow::Result<()> {
//! init_test_logging(None);
//! let fixture = RequestFixture::new(std::path::Path::new("/srv/web"), 5).with_record("7", "Run 1", 10);
//! let renderer = FakeRenderService::new();
//! # Ok(())
//! # }
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeDecryptor, FakeRenderService, RenderBehavior};
pub use fixtures::{GRAPH_FIELD, PIVOT_FIELD, RequestFixture, test_plugin};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run without log output.
///
/// ```bash
/// RUST_LOG=linegraph=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
