//! Per-index readers and writers for sub-task inputs and outputs.
//!
//! Every sub-task owns a prefix of the form `<base>/<index>`; its inputs, outputs
//! and recorded failure live at well-known names beneath that prefix.

use crate::constants::{ERROR_FILENAME, INDEX_LOOKUP_FILENAME, INPUTS_FILENAME, OUTPUTS_FILENAME};
use crate::errors::Result;
use crate::storage::{DataReference, DataStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named literal values, ordered by name
pub type LiteralMap = BTreeMap<String, serde_json::Value>;

/// Failure recorded by a sub-task in place of outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub message: String,
}

/// Reads the inputs of one sub-task
#[derive(Debug, Clone)]
pub struct InputReader {
    store: DataStore,
    prefix: DataReference,
}

impl InputReader {
    pub fn new(store: DataStore, prefix: DataReference) -> Self {
        Self { store, prefix }
    }

    pub fn prefix(&self) -> &DataReference {
        &self.prefix
    }

    pub fn input_path(&self) -> Result<DataReference> {
        self.store.construct_reference(&self.prefix, INPUTS_FILENAME)
    }

    /// Read the input literals; a sub-task without an inputs file has no inputs
    pub async fn get(&self) -> Result<LiteralMap> {
        let path = self.input_path()?;
        if !self.store.head(&path).await? {
            return Ok(LiteralMap::new());
        }
        self.store.read_json(&path).await
    }
}

/// Writes the outputs of one sub-task
#[derive(Debug, Clone)]
pub struct OutputWriter {
    store: DataStore,
    prefix: DataReference,
}

impl OutputWriter {
    pub fn new(store: DataStore, prefix: DataReference) -> Self {
        Self { store, prefix }
    }

    pub fn prefix(&self) -> &DataReference {
        &self.prefix
    }

    pub fn output_path(&self) -> Result<DataReference> {
        self.store.construct_reference(&self.prefix, OUTPUTS_FILENAME)
    }

    pub async fn put(&self, outputs: &LiteralMap) -> Result<()> {
        self.store.write_json(&self.output_path()?, outputs).await
    }

    pub async fn put_error(&self, message: impl Into<String>) -> Result<()> {
        let path = self.store.construct_reference(&self.prefix, ERROR_FILENAME)?;
        let error = ExecutionError {
            message: message.into(),
        };
        self.store.write_json(&path, &error).await
    }
}

/// Reads back what a sub-task produced
#[derive(Debug, Clone)]
pub struct OutputReader {
    store: DataStore,
    prefix: DataReference,
}

impl OutputReader {
    pub fn new(store: DataStore, prefix: DataReference) -> Self {
        Self { store, prefix }
    }

    pub fn prefix(&self) -> &DataReference {
        &self.prefix
    }

    pub async fn exists(&self) -> Result<bool> {
        let path = self.store.construct_reference(&self.prefix, OUTPUTS_FILENAME)?;
        self.store.head(&path).await
    }

    pub async fn read(&self) -> Result<LiteralMap> {
        let path = self.store.construct_reference(&self.prefix, OUTPUTS_FILENAME)?;
        self.store.read_json(&path).await
    }

    pub async fn read_error(&self) -> Result<Option<ExecutionError>> {
        let path = self.store.construct_reference(&self.prefix, ERROR_FILENAME)?;
        if !self.store.head(&path).await? {
            return Ok(None);
        }
        self.store.read_json(&path).await.map(Some)
    }
}

fn indexed_prefixes<'a>(
    store: &'a DataStore,
    prefix: &'a DataReference,
    size: usize,
) -> impl Iterator<Item = Result<DataReference>> + 'a {
    (0..size).map(move |idx| store.construct_reference(prefix, &idx.to_string()))
}

/// One input reader per index, rooted at `input_prefix/<index>`
pub fn construct_input_readers(
    store: &DataStore,
    input_prefix: &DataReference,
    size: usize,
) -> Result<Vec<InputReader>> {
    indexed_prefixes(store, input_prefix, size)
        .map(|r| r.map(|prefix| InputReader::new(store.clone(), prefix)))
        .collect()
}

/// One output writer per index, rooted at `output_prefix/<index>`
pub fn construct_output_writers(
    store: &DataStore,
    output_prefix: &DataReference,
    size: usize,
) -> Result<Vec<OutputWriter>> {
    indexed_prefixes(store, output_prefix, size)
        .map(|r| r.map(|prefix| OutputWriter::new(store.clone(), prefix)))
        .collect()
}

/// One output reader per index, rooted at `output_prefix/<index>`
pub fn construct_output_readers(
    store: &DataStore,
    output_prefix: &DataReference,
    size: usize,
) -> Result<Vec<OutputReader>> {
    indexed_prefixes(store, output_prefix, size)
        .map(|r| r.map(|prefix| OutputReader::new(store.clone(), prefix)))
        .collect()
}

/// Location of the dense-slot to original-index map
pub fn index_lookup_path(store: &DataStore, output_prefix: &DataReference) -> Result<DataReference> {
    store.construct_reference(output_prefix, INDEX_LOOKUP_FILENAME)
}

/// Read the index lookup written by discoverability.
///
/// Position `i` of the result is the original index of dense execution slot `i`.
pub async fn read_index_lookup(
    store: &DataStore,
    output_prefix: &DataReference,
) -> Result<Vec<usize>> {
    store
        .read_json(&index_lookup_path(store, output_prefix)?)
        .await
}
