//! Integration test suite for linegraph
//!
//! End-to-end tests of the plugin entry points and the `linegraph` binary,
//! driven with the in-process render service and decryptor fakes from
//! `linegraph::test_utils`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **pipeline**: render calls, cache hits and build coordination
//! - **concurrency**: overlapping builds sharing pages and plaintexts
//! - **failures**: render failures and cleanup of transient files
//! - **invalidation**: cache purges after file changes
//! - **cli**: the `linegraph` binary

mod cli;
mod concurrency;
mod failures;
mod invalidation;
mod pipeline;
