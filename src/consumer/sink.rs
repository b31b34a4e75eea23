//! In-process consumer that hands packets to the caller
//!
//! Useful for embedding (recording, analysis) and as the reference consumer
//! for tests: every negotiated track gets its own queue, read back with
//! [`PacketSink::recv`]. Backchannel medias get a fresh track the caller
//! writes into through [`PacketSink::backchannel`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::media::{parse_query, Codec, Direction, Kind, Media};
use crate::stats::CounterSnapshot;
use crate::track::{Packet, Track};

use super::{Consumer, ConsumerState, Lifecycle};

struct Input {
    kind: Kind,
    codec: Codec,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Packet>>>,
}

/// Consumer that queues negotiated packets for the embedding application
pub struct PacketSink {
    medias: Vec<Media>,
    source: Option<String>,
    lifecycle: Arc<Lifecycle>,
    inputs: Mutex<Vec<Input>>,
    outputs: Mutex<Vec<Arc<Track>>>,
}

impl PacketSink {
    pub fn new(medias: Vec<Media>) -> Self {
        Self {
            medias,
            source: None,
            lifecycle: Lifecycle::new(),
            inputs: Mutex::new(Vec::new()),
            outputs: Mutex::new(Vec::new()),
        }
    }

    /// Sink for a `video=...&audio=...` query
    pub fn from_query(query: &str) -> Self {
        Self::new(parse_query(query))
    }

    /// Mark the URL this sink serves, so streams never loop it back
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Codecs bound so far, in binding order
    pub fn codecs(&self) -> Vec<(Kind, Codec)> {
        self.inputs
            .lock()
            .iter()
            .map(|input| (input.kind, input.codec.clone()))
            .collect()
    }

    /// Next packet from the first live track of `kind`.
    ///
    /// Tracks that ended are skipped, so a track bound later by
    /// re-negotiation takes over. Returns `None` once no track of `kind` is
    /// left or the sink is closed.
    pub async fn recv(&self, kind: Kind) -> Option<Packet> {
        loop {
            let rx = self
                .inputs
                .lock()
                .iter()
                .find(|input| input.kind == kind)
                .map(|input| Arc::clone(&input.rx))?;

            let next = rx.lock().await.recv().await;
            match next {
                Some(packet) => {
                    self.lifecycle.counters().add(packet.len());
                    return Some(packet);
                }
                None => self.inputs.lock().retain(|input| !Arc::ptr_eq(&input.rx, &rx)),
            }
        }
    }

    /// Track this sink feeds upstream for `kind`, once negotiated
    pub fn backchannel(&self, kind: Kind) -> Option<Arc<Track>> {
        self.outputs
            .lock()
            .iter()
            .find(|track| track.kind() == kind)
            .cloned()
    }
}

#[async_trait]
impl Consumer for PacketSink {
    fn format_name(&self) -> &str {
        "sink"
    }

    fn medias(&self) -> Vec<Media> {
        self.medias.clone()
    }

    async fn add_track(&self, media: &Media, codec: &Codec, track: &Arc<Track>) -> Result<()> {
        let (binding, rx) = track.subscribe();
        self.lifecycle.hold(binding)?;

        tracing::debug!(media = %media, codec = %codec, track = track.id(), "Sink track bound");

        self.inputs.lock().push(Input {
            kind: media.kind,
            codec: codec.clone(),
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        });
        Ok(())
    }

    async fn track(&self, media: &Media, codec: &Codec) -> Result<Arc<Track>> {
        if self.lifecycle.is_closed() {
            return Err(Error::Closed("consumer"));
        }

        let outgoing = Media::new(media.kind, Direction::Recvonly, vec![codec.clone()]);
        let track = Track::new(&outgoing, codec.clone());
        self.outputs.lock().push(Arc::clone(&track));
        Ok(track)
    }

    async fn stop(&self) -> Result<()> {
        self.lifecycle.close();
        for track in self.outputs.lock().drain(..) {
            track.close();
        }
        Ok(())
    }

    async fn closed(&self) {
        self.lifecycle.closed().await
    }

    fn state(&self) -> ConsumerState {
        self.lifecycle.state()
    }

    fn source(&self) -> Option<String> {
        self.source.clone()
    }

    fn send(&self) -> CounterSnapshot {
        self.lifecycle.counters().snapshot()
    }
}
