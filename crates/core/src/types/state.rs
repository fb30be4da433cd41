//! Checkpointed per-task execution state

use super::bitset::BitSet;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Phases of an array task, in the order they are visited.
///
/// Non-discoverable tasks go straight from `Discovering` to `Launch`; fully
/// cached tasks go straight to `Success`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Discovering,
    Launch,
    WritingBack,
    Success,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        self == Phase::Success
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Discovering => "discovering",
            Phase::Launch => "launch",
            Phase::WritingBack => "writing_back",
            Phase::Success => "success",
        };
        f.write_str(name)
    }
}

/// State carried between reconciliation passes of one array task.
///
/// `indexes_to_cache` marks the original indices whose results still have to be
/// written to the catalog, i.e. the inverse of the lookup hits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionState {
    pub original_array_size: usize,
    pub original_min_successes: usize,
    pub actual_array_size: usize,
    pub indexes_to_cache: BitSet,
    phase: Phase,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `phase`. Phases never move backwards.
    pub fn set_phase(&mut self, phase: Phase) {
        debug_assert!(
            phase >= self.phase,
            "phase regression from {} to {phase}",
            self.phase
        );
        if phase > self.phase {
            self.phase = phase;
        }
    }

    pub fn set_original_array_size(&mut self, size: usize) {
        self.original_array_size = size;
    }

    pub fn set_original_min_successes(&mut self, min_successes: usize) {
        self.original_min_successes = min_successes;
    }

    pub fn set_actual_array_size(&mut self, size: usize) {
        self.actual_array_size = size;
    }

    pub fn set_indexes_to_cache(&mut self, indexes: BitSet) {
        self.indexes_to_cache = indexes;
    }
}
