//! Cache key derivation
//!
//! A catalog entry is addressed by the task identity, its interface, the
//! user-declared cache version and the content of the sub-task inputs. Equal
//! inputs under an equal task, interface and version resolve to the same entry.

use arraymemo_core::{Identifier, InputReader, LiteralMap, Result, TypedInterface};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Identity of a cached result
#[derive(Debug, Clone)]
pub struct CacheKey {
    pub identifier: Identifier,
    pub typed_interface: TypedInterface,
    pub cache_version: String,
    /// Source of the input content that completes the key
    pub input_reader: InputReader,
}

#[derive(Serialize)]
struct KeyMaterial<'a> {
    identifier: &'a Identifier,
    interface: &'a TypedInterface,
    version: &'a str,
    inputs: &'a LiteralMap,
}

#[derive(Serialize)]
struct LocationMaterial<'a> {
    identifier: &'a Identifier,
    interface: &'a TypedInterface,
    version: &'a str,
    inputs: &'a str,
}

impl CacheKey {
    pub fn new(
        identifier: Identifier,
        typed_interface: TypedInterface,
        cache_version: impl Into<String>,
        input_reader: InputReader,
    ) -> Self {
        Self {
            identifier,
            typed_interface,
            cache_version: cache_version.into(),
            input_reader,
        }
    }

    /// Content digest of this key; reads the inputs through the input reader
    pub async fn digest(&self) -> Result<String> {
        let inputs = self.input_reader.get().await?;
        let material = KeyMaterial {
            identifier: &self.identifier,
            interface: &self.typed_interface,
            version: &self.cache_version,
            inputs: &inputs,
        };
        Ok(sha256_hex(&serde_json::to_vec(&material)?))
    }

    /// Digest of where the inputs live rather than what they contain.
    ///
    /// Cheap to compute and stable across re-submissions of the same request,
    /// which makes it suitable for recognising a batch that is already in flight.
    pub fn location_digest(&self) -> Result<String> {
        let material = LocationMaterial {
            identifier: &self.identifier,
            interface: &self.typed_interface,
            version: &self.cache_version,
            inputs: self.input_reader.prefix().as_str(),
        };
        Ok(sha256_hex(&serde_json::to_vec(&material)?))
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arraymemo_core::{DataReference, DataStore, Variable};
    use serde_json::json;

    async fn key_with_inputs(store: &DataStore, prefix: &str, version: &str, x: i64) -> CacheKey {
        let reader = InputReader::new(store.clone(), DataReference::new(prefix));
        store
            .write_json(&reader.input_path().unwrap(), &json!({"x": x}))
            .await
            .unwrap();
        CacheKey::new(
            Identifier::new("p", "d", "square", "v1"),
            TypedInterface::default()
                .with_input("x", Variable::new("integer"))
                .with_output("y", Variable::new("integer")),
            version,
            reader,
        )
    }

    #[tokio::test]
    async fn test_equal_content_gives_equal_digest() {
        let store = DataStore::in_memory();
        let a = key_with_inputs(&store, "run-a/0", "1.0", 3).await;
        let b = key_with_inputs(&store, "run-b/7", "1.0", 3).await;

        assert_eq!(a.digest().await.unwrap(), b.digest().await.unwrap());
        assert_ne!(a.location_digest().unwrap(), b.location_digest().unwrap());
    }

    #[tokio::test]
    async fn test_version_and_content_change_digest() {
        let store = DataStore::in_memory();
        let base = key_with_inputs(&store, "a/0", "1.0", 3).await;
        let bumped = key_with_inputs(&store, "b/0", "2.0", 3).await;
        let other_input = key_with_inputs(&store, "c/0", "1.0", 4).await;

        let digest = base.digest().await.unwrap();
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, bumped.digest().await.unwrap());
        assert_ne!(digest, other_input.digest().await.unwrap());
    }
}
