//! Error types
//!
//! Every failure that crosses a stream boundary is one of these variants.
//! Transport and resource errors are retried by producers; everything else is
//! reported to the caller as-is.

use thiserror::Error;

pub use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate error type
#[derive(Debug, Error)]
pub enum Error {
    /// Dial, read or write failure on a socket or pipe
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A connect/describe/read phase exceeded its deadline
    #[error("timeout while {0}")]
    Timeout(&'static str),

    /// Subprocess could not be spawned
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote side spoke something we cannot understand
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote side refused our credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No usable producer/consumer pairing
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    /// Malformed source or unknown scheme
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Stream table errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Operation on something already stopped or closed
    #[error("{0} is closed")]
    Closed(&'static str),

    /// Capability not offered by this producer or consumer
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// Programming error detected at runtime
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    /// Whether a producer should retry after this error.
    ///
    /// Transport, timeout and spawn failures are transient. Protocol and
    /// authentication failures are terminal, as is everything raised above the
    /// producer layer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Timeout(_) | Error::Spawn { .. } | Error::Closed(_)
        )
    }
}

/// Negotiation failures between a consumer and a stream's producers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiationError {
    /// Every candidate producer failed; messages joined in binding order
    #[error("streams: {0}")]
    Producers(String),

    /// Producers answered but no codec pair was compatible
    #[error("streams: codecs not matched: {producer} => {consumer}")]
    CodecsNotMatched { producer: String, consumer: String },

    /// The stream has no producer able to answer
    #[error("streams: no sources")]
    NoSources,
}

/// Source configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// URL has no `scheme:` prefix
    #[error("malformed source: {0}")]
    MalformedUrl(String),

    /// No producer factory registered for the scheme
    #[error("unsupported scheme: {0}")]
    UnknownScheme(String),

    /// Source parsed but is unusable (empty command, bad media, ...)
    #[error("invalid source {url}: {reason}")]
    InvalidSource { url: String, reason: String },
}
