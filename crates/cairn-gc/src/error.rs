//! Error types for the collection domain.
//!
//! [`GcError`] is both the error-stream item type and the internal result
//! error of the collector. The taxonomy matters to callers:
//!
//! - `FetchLinks` and `DeleteBlock` are per-key and non-fatal: the run keeps
//!   going after emitting them
//! - `LinksUnreachable` and `BlocksNotDeleted` are aggregates, reported at
//!   most once per run, and tell a caller the run did not complete cleanly
//!   even though individual work may have succeeded
//! - `PinRoots` and `Enumerate` are fatal before the sweep touches anything
//! - `Cancelled` is control flow and never appears on the error stream

use cairn_core::ContentId;

/// The result type used throughout cairn-gc.
pub type Result<T> = std::result::Result<T, GcError>;

/// Errors produced by a collection run.
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    /// The links of one block could not be retrieved during marking.
    ///
    /// Non-fatal: traversal continues past the failing block, but the run is
    /// flagged incomplete and [`GcError::LinksUnreachable`] follows.
    #[error("could not retrieve links for {cid}")]
    FetchLinks {
        /// The block whose links could not be fetched.
        cid: ContentId,
        /// The underlying cause.
        #[source]
        source: cairn_core::Error,
    },

    /// One block could not be deleted during the sweep.
    ///
    /// Non-fatal: the sweep continues, and [`GcError::BlocksNotDeleted`]
    /// follows once enumeration is exhausted.
    #[error("could not remove {cid}")]
    DeleteBlock {
        /// The block that could not be deleted.
        cid: ContentId,
        /// The underlying cause.
        #[source]
        source: cairn_core::Error,
    },

    /// Aggregate: some links could not be retrieved, so the marked set may
    /// be missing legitimately reachable blocks.
    #[error("could not retrieve some links; marked set is incomplete")]
    LinksUnreachable,

    /// Aggregate: at least one block deletion failed during the sweep.
    #[error("could not delete some blocks")]
    BlocksNotDeleted,

    /// The pin subsystem could not supply its root lists.
    ///
    /// Fatal: reported once, and the run ends without touching the store.
    #[error("could not load pin roots")]
    PinRoots {
        /// The underlying cause.
        #[source]
        source: cairn_core::Error,
    },

    /// Key enumeration could not begin.
    ///
    /// Fatal: reported once, and the run ends without touching the store.
    #[error("could not enumerate stored keys")]
    Enumerate {
        /// The underlying cause.
        #[source]
        source: cairn_core::Error,
    },

    /// The run observed cancellation.
    ///
    /// Used for control flow inside the collector; the run stops quietly and
    /// this value never reaches the error stream.
    #[error("collection run was cancelled")]
    Cancelled,
}
