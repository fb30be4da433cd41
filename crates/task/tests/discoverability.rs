//! Catalog lookup before launch

mod common;

use arraymemo_cache::DownloadResponse;
use arraymemo_core::{
    index_lookup_path, read_index_lookup, BitSet, DataReference, DataStore, Error,
    ExecutionState, OutputReader, Phase,
};
use arraymemo_task::determine_discoverability;
use common::*;

#[tokio::test]
async fn non_discoverable_task_launches_whole_array() {
    let store = DataStore::in_memory();
    let catalog = ScriptedCatalog::misses();
    let (ctx, _rx) = context(Some(plain_template(5)), store.clone(), catalog.clone());

    let state = determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap();

    assert_eq!(state.phase(), Phase::Launch);
    assert_eq!(state.original_array_size, 5);
    assert_eq!(state.original_min_successes, 5);
    assert_eq!(state.actual_array_size, 5);
    assert_eq!(state.indexes_to_cache.len(), 5);
    assert_eq!(state.indexes_to_cache.count_ones(), 0);
    assert_eq!(catalog.downloads(), 0);

    let lookup = index_lookup_path(&store, &DataReference::new(OUTPUT_PREFIX)).unwrap();
    assert!(!store.head(&lookup).await.unwrap());
}

#[tokio::test]
async fn partial_hits_launch_only_misses() {
    let store = DataStore::in_memory();
    seed_inputs(&store, 4).await;
    let catalog = ScriptedCatalog::new(DownloadScript::Hits(BitSet::from_indices(4, [0, 2])));
    let (ctx, _rx) = context(Some(discoverable_template(4)), store.clone(), catalog.clone());

    let state = determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap();

    assert_eq!(state.phase(), Phase::Launch);
    assert_eq!(state.actual_array_size, 2);
    assert_eq!(state.indexes_to_cache, BitSet::from_indices(4, [1, 3]));
    assert_eq!(
        read_index_lookup(&store, &DataReference::new(OUTPUT_PREFIX))
            .await
            .unwrap(),
        vec![1, 3]
    );
    assert_eq!(catalog.downloads(), 1);
}

#[tokio::test]
async fn zero_hits_lookup_lists_every_index() {
    let store = DataStore::in_memory();
    let catalog = ScriptedCatalog::misses();
    let (ctx, _rx) = context(Some(discoverable_template(3)), store.clone(), catalog);

    let state = determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap();

    assert_eq!(state.phase(), Phase::Launch);
    assert_eq!(state.actual_array_size, 3);
    assert_eq!(state.indexes_to_cache.count_ones(), 3);
    assert_eq!(
        read_index_lookup(&store, &DataReference::new(OUTPUT_PREFIX))
            .await
            .unwrap(),
        vec![0, 1, 2]
    );
}

#[tokio::test]
async fn all_hits_skip_straight_to_success() {
    let store = DataStore::in_memory();
    let catalog = ScriptedCatalog::new(DownloadScript::Hits(BitSet::new(3).invert()));
    let (ctx, _rx) = context(Some(discoverable_template(3)), store.clone(), catalog);

    let state = determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap();

    assert_eq!(state.phase(), Phase::Success);
    assert_eq!(state.actual_array_size, 0);
    assert_eq!(state.indexes_to_cache.count_ones(), 0);

    let lookup = index_lookup_path(&store, &DataReference::new(OUTPUT_PREFIX)).unwrap();
    assert!(!store.head(&lookup).await.unwrap());
}

#[tokio::test]
async fn pending_lookup_waits_for_wakeup() {
    let store = DataStore::in_memory();
    let catalog = ScriptedCatalog::new(DownloadScript::Pending);
    let (ctx, mut rx) = context(Some(discoverable_template(4)), store.clone(), catalog.clone());

    let initial = ExecutionState::new();
    let state = determine_discoverability(&ctx, &initial).await.unwrap();
    assert_eq!(state.phase(), Phase::Discovering);
    assert_eq!(state.original_array_size, 4);
    assert!(rx.try_recv().is_err());

    catalog.complete_pending(DownloadResponse::new(BitSet::from_indices(4, [3])));
    assert_eq!(rx.recv().await.unwrap(), exec_id());

    let state = determine_discoverability(&ctx, &state).await.unwrap();
    assert_eq!(state.phase(), Phase::Launch);
    assert_eq!(state.actual_array_size, 3);
    assert_eq!(
        read_index_lookup(&store, &DataReference::new(OUTPUT_PREFIX))
            .await
            .unwrap(),
        vec![0, 1, 2]
    );
    assert_eq!(catalog.downloads(), 2);
}

#[tokio::test]
async fn hits_are_materialized_by_the_catalog_not_the_resolver() {
    let store = DataStore::in_memory();
    let catalog = ScriptedCatalog::new(DownloadScript::Hits(BitSet::from_indices(2, [0])));
    let (ctx, _rx) = context(Some(discoverable_template(2)), store.clone(), catalog);

    determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap();

    let output = OutputReader::new(store.clone(), DataReference::new(format!("{OUTPUT_PREFIX}/0")));
    assert!(!output.exists().await.unwrap());
}

#[tokio::test]
async fn missing_template_is_permanent() {
    let catalog = ScriptedCatalog::misses();
    let (ctx, _rx) = context(None, DataStore::in_memory(), catalog.clone());

    let err = determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::BadTaskSpecification { .. }));
    assert!(err.to_string().contains("taskTemplate is nil"));
    assert!(!err.is_retryable());
    assert_eq!(catalog.downloads(), 0);
}

#[tokio::test]
async fn missing_array_payload_is_permanent() {
    let mut template = discoverable_template(3);
    template.custom = None;
    let (ctx, _rx) = context(Some(template), DataStore::in_memory(), ScriptedCatalog::misses());

    let err = determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::BadTaskSpecification { .. }));
}

#[tokio::test]
async fn discoverable_task_without_interface_is_permanent() {
    let mut template = discoverable_template(3);
    template.interface = None;
    let catalog = ScriptedCatalog::misses();
    let (ctx, _rx) = context(Some(template), DataStore::in_memory(), catalog.clone());

    let err = determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::BadTaskSpecification { .. }));
    assert_eq!(catalog.downloads(), 0);
}

#[tokio::test]
async fn rejected_submission_is_retryable() {
    let (ctx, _rx) = context(
        Some(discoverable_template(3)),
        DataStore::in_memory(),
        ScriptedCatalog::new(DownloadScript::QueueFull),
    );

    let err = determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::WorkQueue { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn wrong_sized_response_is_an_internal_mismatch() {
    let (ctx, _rx) = context(
        Some(discoverable_template(3)),
        DataStore::in_memory(),
        ScriptedCatalog::new(DownloadScript::WrongSize(2)),
    );

    let err = determine_discoverability(&ctx, &ExecutionState::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::InternalMismatch {
            expected: 3,
            actual: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn failed_lookup_write_is_retryable() {
    let store = FailingStore::data_store("indexlookup.json");
    let catalog = ScriptedCatalog::misses();
    let (ctx, _rx) = context(Some(discoverable_template(2)), store, catalog.clone());

    let initial = ExecutionState::new();
    let err = determine_discoverability(&ctx, &initial).await.unwrap_err();

    assert!(matches!(err, Error::Storage { .. }));
    assert!(err.is_retryable());
    assert_eq!(initial.phase(), Phase::Discovering);
    assert_eq!(catalog.downloads(), 1);
}

#[tokio::test]
async fn failed_lookup_batch_is_retryable_and_keeps_state() {
    let store = DataStore::in_memory();
    let (ctx, _rx) = context(
        Some(discoverable_template(3)),
        store.clone(),
        ScriptedCatalog::new(DownloadScript::Failed("catalog unavailable")),
    );

    let initial = ExecutionState::new();
    let err = determine_discoverability(&ctx, &initial).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Catalog { ref message } if message.contains("catalog unavailable")
    ));
    assert!(err.is_retryable());
    assert_eq!(initial, ExecutionState::new());
    assert!(!store
        .head(&index_lookup_path(&store, &DataReference::new(OUTPUT_PREFIX)).unwrap())
        .await
        .unwrap());
}
