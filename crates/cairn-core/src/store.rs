//! Block store contract and in-memory implementation.
//!
//! The [`BlockStore`] trait is the storage capability the collector consumes:
//! an exclusive collection lock, a key-enumeration stream, and block-level
//! read/write/delete operations.
//!
//! ## Lock Discipline
//!
//! [`BlockStore::gc_lock`] hands out the write side of a store-wide
//! reader-writer lock. Mutating operations on non-collection paths
//! ([`BlockStore::put`]) acquire the read side, so they queue behind a
//! running collection and a collection queues behind in-flight writes.
//! [`BlockStore::delete_block`] is the collection path: the caller already
//! holds the write guard, so it takes no lock of its own.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::cid::ContentId;
use crate::error::{Error, Result};

/// Handle for a held collection lock.
///
/// Releases the lock when dropped, on every exit path.
pub type GcGuard = tokio::sync::OwnedRwLockWriteGuard<()>;

/// Storage contract for a content-addressed block store.
#[async_trait]
pub trait BlockStore: Send + Sync + 'static {
    /// Acquires the exclusive collection lock.
    ///
    /// Blocks until in-flight mutators have drained. The returned guard must
    /// be held for the entire collection run and releases on drop.
    async fn gc_lock(&self) -> GcGuard;

    /// Begins an enumeration of every stored key.
    ///
    /// Keys arrive in arbitrary order; the channel closes after the last one.
    ///
    /// # Errors
    ///
    /// Returns an error if the enumeration could not begin at all.
    async fn all_keys(&self) -> Result<mpsc::Receiver<ContentId>>;

    /// Deletes a block on the collection path.
    ///
    /// The caller must hold the guard from [`BlockStore::gc_lock`].
    ///
    /// # Errors
    ///
    /// Returns an error if the block could not be removed. Deleting an absent
    /// block succeeds (idempotent).
    async fn delete_block(&self, cid: &ContentId) -> Result<()>;

    /// Stores a block and returns its content identifier.
    ///
    /// Queues behind a running collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the block could not be written.
    async fn put(&self, data: Bytes) -> Result<ContentId>;

    /// Reads a block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockNotFound`] if the block does not exist.
    async fn get(&self, cid: &ContentId) -> Result<Bytes>;

    /// Returns true if the block exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be consulted.
    async fn has(&self, cid: &ContentId) -> Result<bool>;
}

/// In-memory block store for tests and embedding.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<ContentId, Bytes>>,
    gc_gate: Arc<tokio::sync::RwLock<()>>,
    fail_deletes: RwLock<HashSet<ContentId>>,
}

impl MemoryBlockStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a failure for future deletions of `cid`.
    ///
    /// The block stays present and [`BlockStore::delete_block`] reports a
    /// storage error for it until [`MemoryBlockStore::clear_failures`].
    pub fn fail_delete(&self, cid: ContentId) {
        if let Ok(mut failures) = self.fail_deletes.write() {
            failures.insert(cid);
        }
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.fail_deletes.write() {
            failures.clear();
        }
    }

    /// Returns the number of stored blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn block_count(&self) -> Result<usize> {
        Ok(self.read_blocks()?.len())
    }

    fn read_blocks(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<ContentId, Bytes>>> {
        self.blocks.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }

    fn write_blocks(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<ContentId, Bytes>>> {
        self.blocks.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn gc_lock(&self) -> GcGuard {
        Arc::clone(&self.gc_gate).write_owned().await
    }

    async fn all_keys(&self) -> Result<mpsc::Receiver<ContentId>> {
        let keys: Vec<ContentId> = self.read_blocks()?.keys().copied().collect();

        let (tx, rx) = mpsc::channel(keys.len().max(1));
        for key in keys {
            // Capacity matches the snapshot, so the buffer cannot fill.
            let _ = tx.try_send(key);
        }
        Ok(rx)
    }

    async fn delete_block(&self, cid: &ContentId) -> Result<()> {
        let injected = self
            .fail_deletes
            .read()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .contains(cid);
        if injected {
            return Err(Error::storage(format!("injected delete failure for {cid}")));
        }

        self.write_blocks()?.remove(cid);
        Ok(())
    }

    async fn put(&self, data: Bytes) -> Result<ContentId> {
        let _gate = self.gc_gate.read().await;

        let cid = ContentId::from_data(&data);
        self.write_blocks()?.insert(cid, data);
        Ok(cid)
    }

    async fn get(&self, cid: &ContentId) -> Result<Bytes> {
        self.read_blocks()?
            .get(cid)
            .cloned()
            .ok_or(Error::BlockNotFound { cid: *cid })
    }

    async fn has(&self, cid: &ContentId) -> Result<bool> {
        Ok(self.read_blocks()?.contains_key(cid))
    }
}
