//! Producers: active bindings to media sources
//!
//! A [`Producer`] is one live connection (socket, subprocess, ...) exposing a
//! fixed set of medias. Streams never hold producers directly; they hold
//! [`ProducerBinding`]s, which own the source URL and drive the lifecycle:
//!
//! ```text
//!   Idle ──► Connecting ──► Connected ──► Reconnecting ──► Connected
//!                 │              │              │
//!                 └──────────────┴──────────────┴──► Stopped ──► Connecting
//! ```
//!
//! Bindings dial lazily, share one upstream track between every consumer that
//! asks for the same codec, and move those consumers onto the new connection
//! when a dropped source reconnects.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::media::{Codec, Media};
use crate::stats::CounterSnapshot;
use crate::track::Track;

pub mod backoff;
pub mod binding;

pub use backoff::ReconnectPolicy;
pub use binding::ProducerBinding;

/// Capability set of a media source
#[async_trait]
pub trait Producer: Send + Sync {
    /// Protocol name shown in introspection (e.g. `exec`, `tcp`)
    fn format_name(&self) -> &str;

    /// Medias this source can deliver right now.
    ///
    /// Medias that failed discovery are simply absent. Sources that learn
    /// their capabilities lazily may return more entries after `track`.
    fn medias(&self) -> Vec<Media>;

    /// Track carrying `codec` from one of this producer's medias
    async fn track(&self, media: &Media, codec: &Codec) -> Result<Arc<Track>>;

    /// Feed a consumer-supplied track back into the source (backchannel)
    async fn add_track(&self, _media: &Media, _codec: &Codec, _track: &Arc<Track>) -> Result<()> {
        Err(Error::Unsupported("backchannel"))
    }

    /// Pump packets until the transport closes or `stop` is called
    async fn start(&self) -> Result<()>;

    /// Release the transport; unblocks a running `start`
    async fn stop(&self) -> Result<()>;

    /// Bytes and packets received from the source
    fn recv(&self) -> CounterSnapshot;
}

/// Opens producers for one URL scheme
#[async_trait]
pub trait ProducerFactory: Send + Sync {
    async fn open(&self, url: &str) -> Result<Arc<dyn Producer>>;
}

#[async_trait]
impl<F, Fut> ProducerFactory for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Arc<dyn Producer>>> + Send + 'static,
{
    async fn open(&self, url: &str) -> Result<Arc<dyn Producer>> {
        (self)(url.to_string()).await
    }
}

/// Lifecycle state of a producer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerState {
    /// Never dialled
    Idle,
    /// Dial and capability discovery in progress
    Connecting,
    /// Live connection with known medias
    Connected,
    /// Connection dropped while consumers are bound; retrying
    Reconnecting,
    /// Stopped explicitly, idle, or after a fatal error
    Stopped,
}

/// Introspection snapshot of one producer binding
#[derive(Debug, Clone, Serialize)]
pub struct ProducerInfo {
    pub url: String,
    pub state: ProducerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub medias: Vec<String>,
    /// Receivers bound across all of this producer's tracks
    pub receivers: usize,
    pub recv: CounterSnapshot,
    /// Average receive rate in bits per second
    pub bitrate: u64,
    /// Packets written into this producer's tracks, summed
    pub tracks: CounterSnapshot,
    pub always_on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
