//! Consumers: active bindings to media sinks
//!
//! A consumer declares the medias it wants, receives the tracks negotiated for
//! it, and serializes packets to its own transport. It is `Active` from
//! creation until its transport closes or it is stopped, then `Closed` for
//! good; closing releases every track binding it holds.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::media::{parse_query, Codec, Media};
use crate::stats::{CounterSnapshot, Counters};
use crate::track::{Binding, Track};

pub mod sink;
pub mod writer;

pub use sink::PacketSink;
pub use writer::WriterConsumer;

/// Capability set of a media sink
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Protocol name shown in introspection (e.g. `mjpeg`, `sink`)
    fn format_name(&self) -> &str;

    /// Requested medias, codecs in preference order
    fn medias(&self) -> Vec<Media>;

    /// Bind a negotiated producer track to this consumer
    async fn add_track(&self, media: &Media, codec: &Codec, track: &Arc<Track>) -> Result<()>;

    /// Track this consumer feeds for a backchannel media
    async fn track(&self, _media: &Media, _codec: &Codec) -> Result<Arc<Track>> {
        Err(Error::Unsupported("backchannel"))
    }

    /// Close the consumer and release its bindings
    async fn stop(&self) -> Result<()>;

    /// Resolves once the consumer is closed (client gone, write error, stop)
    async fn closed(&self);

    fn state(&self) -> ConsumerState;

    /// URL this consumer itself serves, if any.
    ///
    /// A stream never feeds a consumer from a producer with the same URL.
    fn source(&self) -> Option<String> {
        None
    }

    /// Remote peer description for introspection
    fn remote(&self) -> Option<String> {
        None
    }

    /// Bytes and packets delivered to the client
    fn send(&self) -> CounterSnapshot;
}

/// What the API layer knows when a client connects
#[derive(Debug, Clone, Default)]
pub struct ConsumerRequest {
    pub medias: Vec<Media>,
    pub remote: Option<String>,
    pub source: Option<String>,
}

impl ConsumerRequest {
    /// Build a request from a `video=...&audio=...` query
    pub fn from_query(query: &str) -> Self {
        Self {
            medias: parse_query(query),
            ..Default::default()
        }
    }

    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Builds consumers for one output protocol
#[async_trait]
pub trait ConsumerFactory: Send + Sync {
    async fn open(&self, request: ConsumerRequest) -> Result<Arc<dyn Consumer>>;
}

#[async_trait]
impl<F, Fut> ConsumerFactory for F
where
    F: Fn(ConsumerRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Arc<dyn Consumer>>> + Send + 'static,
{
    async fn open(&self, request: ConsumerRequest) -> Result<Arc<dyn Consumer>> {
        (self)(request).await
    }
}

/// Consumer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerState {
    Active,
    Closed,
}

/// Introspection snapshot of one consumer
#[derive(Debug, Clone, Serialize)]
pub struct ConsumerInfo {
    pub id: u64,
    pub format: String,
    pub state: ConsumerState,
    pub medias: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    pub send: CounterSnapshot,
}

impl ConsumerInfo {
    pub fn new(id: u64, consumer: &dyn Consumer) -> Self {
        Self {
            id,
            format: consumer.format_name().to_string(),
            state: consumer.state(),
            medias: consumer.medias().iter().map(ToString::to_string).collect(),
            remote: consumer.remote(),
            send: consumer.send(),
        }
    }
}

/// Shared close/bookkeeping for consumer implementations
#[derive(Debug, Default)]
pub struct Lifecycle {
    cancel: CancellationToken,
    bindings: Mutex<Vec<Binding>>,
    send: Counters,
}

impl Lifecycle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Keep a binding alive until the consumer closes
    pub fn hold(&self, binding: Binding) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed("consumer"));
        }
        self.bindings.lock().push(binding);
        Ok(())
    }

    /// Close once; unbinds every held binding
    pub fn close(&self) {
        self.cancel.cancel();
        let bindings = std::mem::take(&mut *self.bindings.lock());
        drop(bindings);
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> ConsumerState {
        if self.is_closed() {
            ConsumerState::Closed
        } else {
            ConsumerState::Active
        }
    }

    pub async fn closed(&self) {
        self.cancel.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn counters(&self) -> &Counters {
        &self.send
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{Direction, Kind};

    #[test]
    fn test_request_from_query() {
        let request = ConsumerRequest::from_query("video=h264&audio")
            .remote("10.0.0.5:51000")
            .source("rtsp://gateway/camera1");

        assert_eq!(request.medias.len(), 2);
        assert_eq!(request.medias[0].kind, Kind::Video);
        assert_eq!(request.medias[1].direction, Direction::Sendonly);
        assert_eq!(request.remote.as_deref(), Some("10.0.0.5:51000"));
        assert_eq!(request.source.as_deref(), Some("rtsp://gateway/camera1"));
    }

    #[tokio::test]
    async fn test_lifecycle_close_releases_bindings() {
        let media = Media::new(Kind::Video, Direction::Recvonly, vec![]);
        let track = Track::new(&media, Codec::new("H264"));
        let lifecycle = Lifecycle::new();

        let (binding, _rx) = track.subscribe();
        lifecycle.hold(binding).unwrap();
        assert_eq!(track.receiver_count(), 1);
        assert_eq!(lifecycle.state(), ConsumerState::Active);

        lifecycle.close();
        lifecycle.closed().await;
        assert_eq!(track.receiver_count(), 0);
        assert_eq!(lifecycle.state(), ConsumerState::Closed);

        let (late, _rx) = track.subscribe();
        assert!(matches!(lifecycle.hold(late), Err(Error::Closed(_))));
    }
}
