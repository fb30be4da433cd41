//! Core domain types for array task memoization.
//!
//! - **`bitset`**: fixed-size index sets used to track cached sub-tasks
//! - **`identifiers`**: task and task-execution identities
//! - **`state`**: the checkpointed execution state and its phases
//! - **`template`**: task templates, interfaces and the array job payload

pub mod bitset;
pub mod identifiers;
pub mod state;
pub mod template;

pub use bitset::*;
pub use identifiers::*;
pub use state::*;
pub use template::*;
