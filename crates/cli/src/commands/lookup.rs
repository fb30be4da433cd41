use arraymemo_core::{index_lookup_path, read_index_lookup, DataReference, DataStore};

pub async fn execute(store: &DataStore, outputs: String) -> eyre::Result<()> {
    let lookup = load(store, outputs).await?;
    println!("{}", serde_json::to_string(&lookup)?);
    Ok(())
}

/// The index lookup of a run, or `None` if the run launched its array whole
/// or had nothing left to launch
pub async fn load(store: &DataStore, outputs: String) -> eyre::Result<Option<Vec<usize>>> {
    let outputs = DataReference::new(outputs);
    if !store.head(&index_lookup_path(store, &outputs)?).await? {
        tracing::debug!(outputs = %outputs, "No index lookup written for this run");
        return Ok(None);
    }
    Ok(Some(read_index_lookup(store, &outputs).await?))
}
