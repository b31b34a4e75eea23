//! Registry error types

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No stream with this name and nothing to build it from
    #[error("stream not found: {0}")]
    StreamNotFound(String),

    /// Name resolution revisited a name it already passed through
    #[error("stream recursion: {0}")]
    Recursion(String),

    /// `get_or_patch` without a `src` parameter
    #[error("source query parameter is required")]
    MissingSource,

    /// Stream names must be non-empty
    #[error("empty stream name")]
    EmptyName,
}
