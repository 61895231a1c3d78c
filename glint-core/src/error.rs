//! Loader errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving an identity to image bytes.
///
/// None of these reach the list consumer: the coordinator collapses every
/// failure into a "no image" delivery and logs the detail.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No cache entry exists for the key.
    #[error("Cache entry not found: {0}")]
    NotFound(String),

    /// Reading or writing the cache directory failed.
    #[error("IO error at {path:?}: {source}")]
    Io {
        /// File or directory the operation touched.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// The transfer failed or the server answered with a non-2xx status.
    #[error("Network error: {0}")]
    Network(String),

    /// Bytes could not be decoded as an image.
    #[error("Decode error: {0}")]
    Decode(String),

    /// No cache key can be derived from the identity.
    #[error("Invalid resource identity: {0}")]
    InvalidIdentity(String),

    /// A background task failed or the runtime was unavailable.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoaderError {
    pub(crate) fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for a cache miss, a normal condition on the fetch path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;
