//! Array task memoization for arraymemo
//!
//! This crate looks up array sub-tasks in the catalog before launch, launches
//! only the misses, and writes their results back afterwards. The
//! [`Reconciler`] drives a task through those phases.

pub mod array;
pub mod context;
pub mod identity;
pub mod reconciler;

pub use array::*;
pub use context::*;
pub use identity::IdentityExecutor;
pub use reconciler::*;
