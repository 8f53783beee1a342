//! Content-derived identifiers for stored blocks.
//!
//! Every block in a Cairn store is keyed by a [`ContentId`]: the SHA-256
//! digest of its payload. Identifiers are:
//!
//! - **Opaque**: no internal structure is relevant beyond equality/hashing
//! - **Immutable**: derived once from content, never reassigned
//! - **Comparable**: `Eq + Ord + Hash`, so they work as set and map keys
//!
//! Blocks reference other blocks through [`Link`] values, forming a directed
//! graph that the collector traverses.
//!
//! # Example
//!
//! ```rust
//! use cairn_core::cid::ContentId;
//!
//! let id = ContentId::from_data(b"hello world");
//! let parsed: ContentId = id.to_string().parse().unwrap();
//! assert_eq!(id, parsed);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Number of bytes in a content identifier (SHA-256 digest width).
pub const CONTENT_ID_LEN: usize = 32;

/// A content-derived identifier for a stored block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId([u8; CONTENT_ID_LEN]);

impl ContentId {
    /// Derives the identifier for the given block payload.
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(digest.into())
    }

    /// Creates an identifier from a raw digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CONTENT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CONTENT_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full digests drown test output; eight hex chars identify a block
        // unambiguously in practice.
        write!(f, "ContentId({}..)", &hex::encode(self.0)[..8])
    }
}

impl FromStr for ContentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::InvalidId {
            message: format!("invalid content ID '{s}': {e}"),
        })?;
        let digest: [u8; CONTENT_ID_LEN] =
            bytes.try_into().map_err(|_| Error::InvalidId {
                message: format!("invalid content ID '{s}': expected {CONTENT_ID_LEN} bytes"),
            })?;
        Ok(Self(digest))
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A reference from one block to a child block.
///
/// The `name` and `size` fields are opaque metadata carried along from the
/// block format; only `target` matters to reachability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Human-readable edge name, if the block format provides one.
    pub name: String,
    /// Cumulative size hint for the subtree behind this link.
    pub size: u64,
    /// The child block this link points at.
    pub target: ContentId,
}

impl Link {
    /// Creates a link to the given target with empty metadata.
    #[must_use]
    pub fn to(target: ContentId) -> Self {
        Self {
            name: String::new(),
            size: 0,
            target,
        }
    }
}
