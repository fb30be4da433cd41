//! Shared utilities for arraymemo
//!
//! Filesystem storage with atomic writes, and logging setup.

pub mod atomic_file;
pub mod file_store;
pub mod tracing;

pub use atomic_file::write_atomic;
pub use file_store::FileStore;
