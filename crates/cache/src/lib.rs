//! Catalog protocol for arraymemo
//!
//! This crate defines the vocabulary used to talk to an out-of-process,
//! content-addressed result catalog:
//! - Cache keys derived from task identity, interface, version and inputs
//! - Batched download and upload requests
//! - Futures that are polled or subscribed to instead of awaited
//! - The `AsyncClient` contract and a store-backed `LocalCatalog`

pub mod client;
pub mod errors;
pub mod future;
pub mod keys;
pub mod local;
pub mod requests;

pub use client::AsyncClient;
pub use errors::{CacheError, Error, RecoveryHint, Result};
pub use future::*;
pub use keys::CacheKey;
pub use local::LocalCatalog;
pub use requests::*;
