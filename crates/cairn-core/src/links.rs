//! Link resolution contract and in-memory implementation.
//!
//! A [`LinkResolver`] answers one question: given a block identifier, what
//! other blocks does it reference? The contract deliberately says nothing
//! about block formats; parsing links out of payloads belongs to the
//! implementation behind the trait.
//!
//! ## Offline Views
//!
//! [`LinkResolver::offline`] returns a view of the same interface that serves
//! only locally available data, performing no network fetch. It is a second
//! implementation of the trait, not a flag: callers that must not touch the
//! network (the collector, which walks the graph while holding the store's
//! exclusive lock) swap the resolver once and use the same call sites.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::cid::{ContentId, Link};
use crate::error::{Error, Result};

/// Resolution contract: the outgoing links of a block.
#[async_trait]
pub trait LinkResolver: Send + Sync + 'static {
    /// Returns the outgoing links of `cid`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockNotFound`] if the block is not available to this
    /// resolver; that cause must stay distinguishable from every other
    /// failure. Any other error means the block could not be fetched or its
    /// links could not be parsed.
    async fn links(&self, cid: &ContentId) -> Result<Vec<Link>>;

    /// Returns a view that serves only locally available data.
    ///
    /// A resolver that already performs no network fetch returns itself.
    fn offline(self: Arc<Self>) -> Arc<dyn LinkResolver>;
}

/// In-memory [`LinkResolver`] for tests and embedding.
///
/// Resolves from an explicit id-to-links map; identifiers without an entry
/// report [`Error::BlockNotFound`]. Already offline.
#[derive(Debug, Default)]
pub struct MemoryLinkResolver {
    links: RwLock<HashMap<ContentId, Vec<Link>>>,
    fail_fetches: RwLock<HashSet<ContentId>>,
}

impl MemoryLinkResolver {
    /// Creates a new empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the outgoing links of `cid`.
    ///
    /// A block with no children gets an empty list; an unregistered block is
    /// indistinguishable from one the store never held.
    pub fn insert(&self, cid: ContentId, links: Vec<Link>) {
        if let Ok(mut map) = self.links.write() {
            map.insert(cid, links);
        }
    }

    /// Injects a non-"not found" fetch failure for `cid`.
    pub fn fail_links(&self, cid: ContentId) {
        if let Ok(mut failures) = self.fail_fetches.write() {
            failures.insert(cid);
        }
    }
}

#[async_trait]
impl LinkResolver for MemoryLinkResolver {
    async fn links(&self, cid: &ContentId) -> Result<Vec<Link>> {
        let injected = self
            .fail_fetches
            .read()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .contains(cid);
        if injected {
            return Err(Error::storage(format!("injected fetch failure for {cid}")));
        }

        self.links
            .read()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .get(cid)
            .cloned()
            .ok_or(Error::BlockNotFound { cid: *cid })
    }

    fn offline(self: Arc<Self>) -> Arc<dyn LinkResolver> {
        self
    }
}
