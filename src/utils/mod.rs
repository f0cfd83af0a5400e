//! Shared helpers.

pub mod fs;

pub use fs::{atomic_write, atomic_write_async, ensure_dir};
