/// Constants shared across the arraymemo workspace
// Well-known artifact names under a sub-task prefix
pub const INPUTS_FILENAME: &str = "inputs.json";
pub const OUTPUTS_FILENAME: &str = "outputs.json";
pub const ERROR_FILENAME: &str = "error.json";

// Dense-slot to original-index map written under the task output prefix
pub const INDEX_LOOKUP_FILENAME: &str = "indexlookup.json";
