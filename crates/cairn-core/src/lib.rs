//! # cairn-core
//!
//! Core abstractions for the Cairn content-addressed block store.
//!
//! This crate provides the foundational types and contracts shared by all
//! Cairn components:
//!
//! - **Identifiers**: [`ContentId`], the content-derived block identifier,
//!   and [`Link`], a reference from one block to another
//! - **Key Sets**: the [`KeySet`] membership contract used by graph traversal
//! - **Store Contract**: the [`BlockStore`] capability trait, including the
//!   exclusive collection lock and key enumeration
//! - **Link Resolution**: the [`LinkResolver`] capability trait with an
//!   offline view
//! - **Pin Bookkeeping**: the [`PinSource`] contract for root classes
//! - **Error Types**: shared error definitions and result alias
//!
//! ## Crate Boundary
//!
//! `cairn-core` defines contracts and in-memory reference implementations
//! only. Engines (such as the collector in `cairn-gc`) consume these
//! contracts and never reach behind them.
//!
//! ## Example
//!
//! ```rust
//! use cairn_core::prelude::*;
//!
//! let id = ContentId::from_data(b"hello world");
//! let mut set = MemoryKeySet::new();
//! assert!(set.visit(&id));
//! assert!(!set.visit(&id));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod cid;
pub mod error;
pub mod keyset;
pub mod links;
pub mod observability;
pub mod pinner;
pub mod store;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use cairn_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cid::{ContentId, Link};
    pub use crate::error::{Error, Result};
    pub use crate::keyset::{KeySet, MemoryKeySet};
    pub use crate::links::{LinkResolver, MemoryLinkResolver};
    pub use crate::pinner::{MemoryPinSource, PinSource};
    pub use crate::store::{BlockStore, GcGuard, MemoryBlockStore};
}

// Re-export key types at crate root for ergonomics
pub use cid::{ContentId, Link};
pub use error::{Error, Result};
pub use keyset::{KeySet, MemoryKeySet};
pub use links::{LinkResolver, MemoryLinkResolver};
pub use observability::{init_logging, LogFormat};
pub use pinner::{MemoryPinSource, PinSource};
pub use store::{BlockStore, GcGuard, MemoryBlockStore};
