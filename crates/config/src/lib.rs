//! Configuration for arraymemo
//!
//! This crate resolves catalog, reconciler and store settings from defaults,
//! an optional JSON config file and `ARRAYMEMO_*` environment variables.

pub mod config;
pub mod loader;

pub use config::*;
pub use loader::*;
