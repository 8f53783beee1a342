//! Pin bookkeeping contract.
//!
//! Pins protect blocks from collection. The bookkeeping itself (where pins
//! are recorded, how they are updated) lives outside this crate; the
//! collector only needs the three root classes a pinner maintains:
//!
//! - **Recursive**: protected together with everything reachable from them
//! - **Direct**: protected themselves, children not implied
//! - **Internal**: bookkeeping objects the pin subsystem depends on,
//!   traversed like recursive roots
//!
//! Root lists are read fresh per collection run; nothing here persists.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::cid::ContentId;
use crate::error::{Error, Result};

/// The root classes a pin subsystem supplies to the collector.
///
/// Implementations should return roots in a deterministic order so that
/// collection runs are reproducible.
#[async_trait]
pub trait PinSource: Send + Sync + 'static {
    /// Roots protected together with their reachable descendants.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin records could not be read.
    async fn recursive_pins(&self) -> Result<Vec<ContentId>>;

    /// Roots protected themselves, with no traversal of children.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin records could not be read.
    async fn direct_pins(&self) -> Result<Vec<ContentId>>;

    /// Bookkeeping roots the pin subsystem itself depends on.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin records could not be read.
    async fn internal_pins(&self) -> Result<Vec<ContentId>>;
}

/// In-memory [`PinSource`] for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryPinSource {
    recursive: RwLock<Vec<ContentId>>,
    direct: RwLock<Vec<ContentId>>,
    internal: RwLock<Vec<ContentId>>,
}

impl MemoryPinSource {
    /// Creates a source with no pins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the recursive roots.
    pub fn set_recursive(&self, roots: Vec<ContentId>) {
        if let Ok(mut pins) = self.recursive.write() {
            *pins = roots;
        }
    }

    /// Replaces the direct roots.
    pub fn set_direct(&self, roots: Vec<ContentId>) {
        if let Ok(mut pins) = self.direct.write() {
            *pins = roots;
        }
    }

    /// Replaces the internal roots.
    pub fn set_internal(&self, roots: Vec<ContentId>) {
        if let Ok(mut pins) = self.internal.write() {
            *pins = roots;
        }
    }
}

fn read_roots(slot: &RwLock<Vec<ContentId>>) -> Result<Vec<ContentId>> {
    slot.read().map(|pins| pins.clone()).map_err(|_| Error::Internal {
        message: "lock poisoned".into(),
    })
}

#[async_trait]
impl PinSource for MemoryPinSource {
    async fn recursive_pins(&self) -> Result<Vec<ContentId>> {
        read_roots(&self.recursive)
    }

    async fn direct_pins(&self) -> Result<Vec<ContentId>> {
        read_roots(&self.direct)
    }

    async fn internal_pins(&self) -> Result<Vec<ContentId>> {
        read_roots(&self.internal)
    }
}
