//! The collection orchestrator: mark, then sweep.
//!
//! [`collect`] runs one mark-and-sweep pass over a block store as a single
//! background task and hands the caller a [`GcRun`]: two bounded streams,
//! one of deleted keys and one of errors. Both close exactly once, after
//! which no further values arrive; values on the two streams interleave
//! arbitrarily.
//!
//! ```text
//! collect()
//!     │
//!     ├── Acquire the store's exclusive collection lock
//!     │
//!     ├── Switch link resolution to its offline view
//!     │
//!     ├── Mark: build the colored set (four passes; see [`crate::mark`])
//!     │
//!     ├── Sweep: enumerate all keys, delete every unmarked one
//!     │
//!     └── Emit one aggregate error if any deletion failed
//! ```
//!
//! ## Lock Extent
//!
//! The lock is taken before any other work and held across **both** phases.
//! Releasing it between mark and sweep would open a window where a block is
//! pinned or written after marking and then swept as garbage. The guard
//! drops on every exit path, including cancellation and internal failure.
//!
//! ## Partial Marks
//!
//! When the mark phase reports an incomplete set, the run emits
//! [`GcError::LinksUnreachable`] and **still sweeps** with the partial set.
//! This favors forward progress and can under-protect blocks whose links
//! could not be resolved; callers decide whether to act on the aggregate
//! error. Do not change this into an abort without revisiting the deletion
//! safety story recorded in DESIGN.md.

use std::sync::Arc;

use cairn_core::observability::gc_span;
use cairn_core::{BlockStore, ContentId, KeySet, LinkResolver, PinSource};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn, Instrument};

use crate::cancel::CancelToken;
use crate::error::GcError;
use crate::mark::colored_set;

const DEFAULT_STREAM_BUFFER: usize = 64;

fn default_stream_buffer() -> usize {
    DEFAULT_STREAM_BUFFER
}

/// Configuration for collection runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcConfig {
    /// Capacity of each output stream.
    ///
    /// The sweep parks on a full stream until the consumer catches up (or
    /// the run is cancelled); a larger buffer decouples the two further.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            stream_buffer: default_stream_buffer(),
        }
    }
}

/// Handle to one running collection.
#[derive(Debug)]
pub struct GcRun {
    /// Keys of blocks actually deleted by this run, in no particular order.
    pub deleted: mpsc::Receiver<ContentId>,
    /// Per-key and aggregate errors, as described on [`GcError`].
    pub errors: mpsc::Receiver<GcError>,
}

impl GcRun {
    /// Consumes both streams to completion.
    ///
    /// Reads the two streams concurrently, so a full buffer on one never
    /// deadlocks against the other.
    pub async fn drain(self) -> (Vec<ContentId>, Vec<GcError>) {
        let Self {
            mut deleted,
            mut errors,
        } = self;

        tokio::join!(
            async move {
                let mut keys = Vec::new();
                while let Some(key) = deleted.recv().await {
                    keys.push(key);
                }
                keys
            },
            async move {
                let mut failures = Vec::new();
                while let Some(failure) = errors.recv().await {
                    failures.push(failure);
                }
                failures
            },
        )
    }
}

/// Starts a collection run with the default configuration.
///
/// See [`collect_with_config`].
pub fn collect<S, L, P>(
    store: Arc<S>,
    links: Arc<L>,
    pins: Arc<P>,
    best_effort_roots: Vec<ContentId>,
    cancel: CancelToken,
) -> GcRun
where
    S: BlockStore + ?Sized,
    L: LinkResolver + ?Sized,
    P: PinSource + ?Sized,
{
    collect_with_config(store, links, pins, best_effort_roots, cancel, GcConfig::default())
}

/// Starts a collection run.
///
/// The run executes on a spawned background task; this function returns
/// immediately with the two output streams. `best_effort_roots` are roots
/// not registered with the pinner that should still be protected when
/// reachable, tolerating missing data.
///
/// Cancellation via `cancel` is observed at every suspension point: lock
/// acquisition, every enumeration read, and every stream write. Once
/// observed, the run emits nothing further, closes both streams, and
/// releases the lock before its task ends.
pub fn collect_with_config<S, L, P>(
    store: Arc<S>,
    links: Arc<L>,
    pins: Arc<P>,
    best_effort_roots: Vec<ContentId>,
    cancel: CancelToken,
    config: GcConfig,
) -> GcRun
where
    S: BlockStore + ?Sized,
    L: LinkResolver + ?Sized,
    P: PinSource + ?Sized,
{
    let buffer = config.stream_buffer.max(1);
    let (deleted_tx, deleted_rx) = mpsc::channel(buffer);
    let (error_tx, error_rx) = mpsc::channel(buffer);

    tokio::spawn(
        run(store, links, pins, best_effort_roots, cancel, deleted_tx, error_tx)
            .instrument(gc_span("collect")),
    );

    GcRun {
        deleted: deleted_rx,
        errors: error_rx,
    }
}

#[allow(clippy::too_many_lines)]
async fn run<S, L, P>(
    store: Arc<S>,
    links: Arc<L>,
    pins: Arc<P>,
    best_effort_roots: Vec<ContentId>,
    cancel: CancelToken,
    deleted_tx: mpsc::Sender<ContentId>,
    error_tx: mpsc::Sender<GcError>,
) where
    S: BlockStore + ?Sized,
    L: LinkResolver + ?Sized,
    P: PinSource + ?Sized,
{
    // Lock first: marking against a store that keeps mutating would let a
    // block become pinned between mark and sweep and still be deleted.
    let _guard = tokio::select! {
        guard = store.gc_lock() => guard,
        () = cancel.cancelled() => {
            debug!("cancelled before acquiring collection lock");
            return;
        }
    };

    // The graph walk must only see locally available data.
    let links = links.offline();

    let outcome = match colored_set(
        links.as_ref(),
        pins.as_ref(),
        &best_effort_roots,
        &error_tx,
        &cancel,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(GcError::Cancelled) => return,
        Err(fatal) => {
            warn!(error = %fatal, "collection aborted before sweep");
            let _ = send_or_cancel(&error_tx, fatal, &cancel).await;
            return;
        }
    };

    if !outcome.complete {
        warn!("some links unreachable; sweeping with a partial marked set");
        if send_or_cancel(&error_tx, GcError::LinksUnreachable, &cancel)
            .await
            .is_err()
        {
            return;
        }
    }
    let marked = outcome.set;
    debug!(marked = marked.len(), "mark phase finished");

    let mut keys = match store.all_keys().await {
        Ok(keys) => keys,
        Err(source) => {
            let fatal = GcError::Enumerate { source };
            warn!(error = %fatal, "collection aborted before sweep");
            let _ = send_or_cancel(&error_tx, fatal, &cancel).await;
            return;
        }
    };

    let mut delete_failed = false;
    loop {
        let key = tokio::select! {
            key = keys.recv() => key,
            () = cancel.cancelled() => {
                debug!("cancelled mid-sweep");
                return;
            }
        };
        let Some(cid) = key else { break };

        if marked.contains(&cid) {
            continue;
        }

        match store.delete_block(&cid).await {
            Ok(()) => {
                debug!(%cid, "deleted unreachable block");
                if send_or_cancel(&deleted_tx, cid, &cancel).await.is_err() {
                    return;
                }
            }
            Err(source) => {
                delete_failed = true;
                warn!(%cid, error = %source, "could not delete block");
                let failure = GcError::DeleteBlock { cid, source };
                if send_or_cancel(&error_tx, failure, &cancel).await.is_err() {
                    return;
                }
            }
        }
    }

    if delete_failed {
        let _ = send_or_cancel(&error_tx, GcError::BlocksNotDeleted, &cancel).await;
    }
}

/// Sends on `tx` unless cancellation (or a gone consumer) ends the run first.
async fn send_or_cancel<T: Send>(
    tx: &mpsc::Sender<T>,
    value: T,
    cancel: &CancelToken,
) -> std::result::Result<(), ()> {
    tokio::select! {
        sent = tx.send(value) => sent.map_err(|_| ()),
        () = cancel.cancelled() => Err(()),
    }
}
