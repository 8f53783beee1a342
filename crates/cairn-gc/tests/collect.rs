//! End-to-end collection scenarios against the in-memory backends.
//!
//! Each test wires a `MemoryBlockStore`, `MemoryLinkResolver`, and
//! `MemoryPinSource` together the way an embedding node would, runs one
//! collection, and asserts on the two output streams plus the store's final
//! contents.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cairn_core::{BlockStore, ContentId, Link, MemoryBlockStore, MemoryLinkResolver, MemoryPinSource};
use cairn_gc::{cancellation, collect, collect_with_config, GcConfig, GcError};

/// Stores a block and registers its (possibly empty) link list.
async fn add_block(
    store: &MemoryBlockStore,
    links: &MemoryLinkResolver,
    payload: &'static str,
    children: Vec<ContentId>,
) -> ContentId {
    let cid = store
        .put(Bytes::from_static(payload.as_bytes()))
        .await
        .expect("put");
    links.insert(cid, children.into_iter().map(Link::to).collect());
    cid
}

#[tokio::test]
async fn retains_reachable_blocks_and_deletes_the_rest() {
    let store = Arc::new(MemoryBlockStore::new());
    let links = Arc::new(MemoryLinkResolver::new());
    let pins = Arc::new(MemoryPinSource::new());

    let b = add_block(&store, &links, "block b", Vec::new()).await;
    let a = add_block(&store, &links, "block a", vec![b]).await;
    let c = add_block(&store, &links, "block c", Vec::new()).await;
    let d = add_block(&store, &links, "block d", Vec::new()).await;
    pins.set_recursive(vec![a]);

    let (_handle, token) = cancellation();
    let run = collect(
        Arc::clone(&store),
        Arc::clone(&links),
        Arc::clone(&pins),
        Vec::new(),
        token,
    );
    let (mut deleted, errors) = run.drain().await;

    assert!(errors.is_empty(), "clean run must emit no errors: {errors:?}");

    deleted.sort();
    let mut expected = vec![c, d];
    expected.sort();
    assert_eq!(deleted, expected);

    assert!(store.has(&a).await.expect("has a"));
    assert!(store.has(&b).await.expect("has b"));
    assert!(!store.has(&c).await.expect("has c"));
    assert!(!store.has(&d).await.expect("has d"));

    // The run released the lock on completion.
    let reacquired = tokio::time::timeout(Duration::from_secs(1), store.gc_lock()).await;
    assert!(reacquired.is_ok());
}

#[tokio::test]
async fn failed_deletion_is_reported_and_does_not_stop_the_sweep() {
    let store = Arc::new(MemoryBlockStore::new());
    let links = Arc::new(MemoryLinkResolver::new());
    let pins = Arc::new(MemoryPinSource::new());

    let b = add_block(&store, &links, "block b", Vec::new()).await;
    let a = add_block(&store, &links, "block a", vec![b]).await;
    let c = add_block(&store, &links, "block c", Vec::new()).await;
    let d = add_block(&store, &links, "block d", Vec::new()).await;
    pins.set_recursive(vec![a]);
    store.fail_delete(d);

    let (_handle, token) = cancellation();
    let run = collect(
        Arc::clone(&store),
        Arc::clone(&links),
        Arc::clone(&pins),
        Vec::new(),
        token,
    );
    let (deleted, errors) = run.drain().await;

    assert_eq!(deleted, vec![c], "only the successful deletion is reported");

    assert_eq!(errors.len(), 2, "unexpected errors: {errors:?}");
    assert!(
        matches!(errors[0], GcError::DeleteBlock { cid, .. } if cid == d),
        "first error must name the failing block: {:?}",
        errors[0]
    );
    assert!(
        matches!(errors[1], GcError::BlocksNotDeleted),
        "aggregate must close the error stream: {:?}",
        errors[1]
    );

    assert!(store.has(&d).await.expect("has d"), "failed delete leaves d in place");
    assert!(!store.has(&c).await.expect("has c"));
}

#[tokio::test]
async fn unreachable_links_are_reported_before_sweep_results() {
    let store = Arc::new(MemoryBlockStore::new());
    let links = Arc::new(MemoryLinkResolver::new());
    let pins = Arc::new(MemoryPinSource::new());

    let b = add_block(&store, &links, "block b", Vec::new()).await;
    let a = add_block(&store, &links, "block a", vec![b]).await;
    let c = add_block(&store, &links, "block c", Vec::new()).await;
    pins.set_recursive(vec![a]);
    links.fail_links(a);

    let (_handle, token) = cancellation();
    let mut run = collect(
        Arc::clone(&store),
        Arc::clone(&links),
        Arc::clone(&pins),
        Vec::new(),
        token,
    );

    // Both mark-phase errors arrive before any sweep output.
    let first = run.errors.recv().await.expect("warning");
    assert!(matches!(first, GcError::FetchLinks { cid, .. } if cid == a));
    let second = run.errors.recv().await.expect("aggregate");
    assert!(matches!(second, GcError::LinksUnreachable));

    let (mut deleted, rest) = run.drain().await;
    assert!(rest.is_empty(), "no further errors expected: {rest:?}");

    // The failing root survives; everything it might have referenced was
    // never marked and is swept with the partial set.
    assert!(store.has(&a).await.expect("has a"));
    deleted.sort();
    let mut expected = vec![b, c];
    expected.sort();
    assert_eq!(deleted, expected);
}

#[tokio::test]
async fn best_effort_root_with_missing_data_is_protected_quietly() {
    let store = Arc::new(MemoryBlockStore::new());
    let links = Arc::new(MemoryLinkResolver::new());
    let pins = Arc::new(MemoryPinSource::new());

    // Stored, but unknown to the resolver: resolution reports not-found.
    let x = store.put(Bytes::from_static(b"best effort")).await.expect("put");

    let (_handle, token) = cancellation();
    let run = collect(
        Arc::clone(&store),
        Arc::clone(&links),
        Arc::clone(&pins),
        vec![x],
        token,
    );
    let (deleted, errors) = run.drain().await;

    assert!(errors.is_empty(), "tolerated miss must not surface: {errors:?}");
    assert!(deleted.is_empty());
    assert!(store.has(&x).await.expect("has x"));
}

#[tokio::test]
async fn direct_pins_protect_the_root_but_not_its_children() {
    let store = Arc::new(MemoryBlockStore::new());
    let links = Arc::new(MemoryLinkResolver::new());
    let pins = Arc::new(MemoryPinSource::new());

    let child = add_block(&store, &links, "child", Vec::new()).await;
    let root = add_block(&store, &links, "root", vec![child]).await;
    pins.set_direct(vec![root]);

    let (_handle, token) = cancellation();
    let run = collect(
        Arc::clone(&store),
        Arc::clone(&links),
        Arc::clone(&pins),
        Vec::new(),
        token,
    );
    let (deleted, errors) = run.drain().await;

    assert!(errors.is_empty());
    assert_eq!(deleted, vec![child]);
    assert!(store.has(&root).await.expect("has root"));
}

#[tokio::test]
async fn internal_pins_are_traversed_recursively() {
    let store = Arc::new(MemoryBlockStore::new());
    let links = Arc::new(MemoryLinkResolver::new());
    let pins = Arc::new(MemoryPinSource::new());

    let leaf = add_block(&store, &links, "bookkeeping leaf", Vec::new()).await;
    let root = add_block(&store, &links, "bookkeeping root", vec![leaf]).await;
    let stray = add_block(&store, &links, "stray", Vec::new()).await;
    pins.set_internal(vec![root]);

    let (_handle, token) = cancellation();
    let run = collect(
        Arc::clone(&store),
        Arc::clone(&links),
        Arc::clone(&pins),
        Vec::new(),
        token,
    );
    let (deleted, errors) = run.drain().await;

    assert!(errors.is_empty());
    assert_eq!(deleted, vec![stray]);
    assert!(store.has(&root).await.expect("has root"));
    assert!(store.has(&leaf).await.expect("has leaf"));
}

#[tokio::test]
async fn cancellation_stops_the_sweep_and_releases_the_lock() {
    let store = Arc::new(MemoryBlockStore::new());
    let links = Arc::new(MemoryLinkResolver::new());
    let pins = Arc::new(MemoryPinSource::new());

    let total = 30;
    for i in 0..total {
        let payload = format!("unreachable block {i}");
        let cid = store.put(Bytes::from(payload)).await.expect("put");
        links.insert(cid, Vec::new());
    }

    let (handle, token) = cancellation();
    // A tiny buffer parks the sweep quickly while nothing consumes.
    let run = collect_with_config(
        Arc::clone(&store),
        Arc::clone(&links),
        Arc::clone(&pins),
        Vec::new(),
        token,
        GcConfig { stream_buffer: 2 },
    );

    // Let the sweep fill the deleted stream and park on it, then cancel.
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();

    // The lock must come free even though the streams were never consumed.
    let reacquired = tokio::time::timeout(Duration::from_secs(1), store.gc_lock()).await;
    assert!(reacquired.is_ok(), "cancelled run must release the lock");
    drop(reacquired);

    let (deleted, _errors) = run.drain().await;
    let remaining = store.block_count().expect("count");
    assert!(
        deleted.len() < total,
        "cancellation must bound the sweep ({} deletions reported)",
        deleted.len()
    );
    assert!(remaining > 0, "most blocks must survive the cancelled sweep");
}

#[tokio::test]
async fn collection_holds_the_lock_for_the_entire_run() {
    let store = Arc::new(MemoryBlockStore::new());
    let links = Arc::new(MemoryLinkResolver::new());
    let pins = Arc::new(MemoryPinSource::new());

    for i in 0..20 {
        let payload = format!("sweepable {i}");
        let cid = store.put(Bytes::from(payload)).await.expect("put");
        links.insert(cid, Vec::new());
    }

    let (_handle, token) = cancellation();
    // Buffer smaller than the sweep, so the run stays alive (and the lock
    // stays held) until the streams are drained.
    let run = collect_with_config(
        Arc::clone(&store),
        Arc::clone(&links),
        Arc::clone(&pins),
        Vec::new(),
        token,
        GcConfig { stream_buffer: 2 },
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A writer queues behind the running collection.
    let writer = Arc::clone(&store);
    let pending = tokio::spawn(async move { writer.put(Bytes::from_static(b"late write")).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished(), "put must queue while collection runs");

    let (deleted, errors) = run.drain().await;
    assert!(errors.is_empty());
    assert_eq!(deleted.len(), 20);

    let cid = pending.await.expect("join").expect("put");
    assert!(store.has(&cid).await.expect("has"));
}
