//! # cairn-gc
//!
//! Concurrent mark-and-sweep garbage collection for the Cairn
//! content-addressed block store.
//!
//! A collection run finds every block reachable from the pinned roots and
//! deletes every stored block that is not, while the store's exclusive
//! collection lock keeps conflicting mutation out for the whole run:
//!
//! - **Mark**: four traversal passes (recursive, best-effort, direct,
//!   internal roots) build one retained set, with per-pass failure tolerance
//! - **Sweep**: every stored key absent from the set is deleted; individual
//!   deletion failures are reported and do not stop the sweep
//! - **Streams**: deleted keys and structured errors arrive on two bounded
//!   channels, readable while the run progresses
//! - **Cancellation**: a [`CancelToken`] stops the run at any suspension
//!   point, always releasing the lock
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cairn_core::{MemoryBlockStore, MemoryLinkResolver, MemoryPinSource};
//! use cairn_gc::{cancellation, collect};
//!
//! # async fn demo() {
//! let store = Arc::new(MemoryBlockStore::new());
//! let links = Arc::new(MemoryLinkResolver::new());
//! let pins = Arc::new(MemoryPinSource::new());
//!
//! let (_handle, token) = cancellation();
//! let run = collect(store, links, pins, Vec::new(), token);
//!
//! let (deleted, errors) = run.drain().await;
//! println!("deleted {} blocks, {} errors", deleted.len(), errors.len());
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod cancel;
pub mod collect;
pub mod error;
pub mod mark;
pub mod walk;

pub use cancel::{cancellation, CancelHandle, CancelToken};
pub use collect::{collect, collect_with_config, GcConfig, GcRun};
pub use error::{GcError, Result};
pub use mark::{colored_set, MarkOutcome};
pub use walk::{descendants, FetchLinks};
