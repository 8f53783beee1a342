//! Error types and result alias for Cairn.
//!
//! This module defines the shared error type used by the store, link, and pin
//! contracts. Errors are structured for programmatic handling: the collector
//! in particular relies on [`Error::is_not_found`] to distinguish a missing
//! block from every other failure cause.

use crate::cid::ContentId;

/// The result type used throughout Cairn.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Cairn store and resolution operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested block does not exist in the store.
    ///
    /// This is the distinguished "object not found" cause: callers that
    /// tolerate missing data match on it via [`Error::is_not_found`].
    #[error("block not found: {cid}")]
    BlockNotFound {
        /// The identifier that was looked up.
        cid: ContentId,
    },

    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the identifier invalid.
        message: String,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this error is the distinguished "block not found"
    /// cause.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::BlockNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished() {
        let missing = Error::BlockNotFound {
            cid: ContentId::from_data(b"gone"),
        };
        assert!(missing.is_not_found());

        let other = Error::storage("disk on fire");
        assert!(!other.is_not_found());
    }

    #[test]
    fn storage_error_carries_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::storage_with_source("delete failed", io);
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
    }
}
