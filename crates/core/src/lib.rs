//! Core domain types, errors, and storage abstractions for `arraymemo`.
//!
//! ## Key Components
//!
//! - **`errors`**: the primary `Error` enum and `Result` alias, including the
//!   retryable/permanent classification the orchestrator relies on.
//! - **`types`**: bitsets, identifiers, task templates and the checkpointed
//!   execution state of an array task.
//! - **`storage`**: the data store that holds sub-task inputs, outputs and side
//!   artifacts.
//! - **`io`**: per-index input readers and output readers/writers.
//! - **`constants`**: well-known artifact file names.

pub mod constants;
pub mod errors;
pub mod io;
pub mod storage;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    io::*,
    storage::{DataReference, DataStore, MemoryStore, RawStore},
    types::*,
};
