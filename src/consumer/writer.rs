//! Consumer that copies payloads to any async byte sink
//!
//! Each negotiated track gets one forwarding task; all of them share the
//! writer, so payloads from different tracks never interleave mid-packet. The
//! first write error closes the consumer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::media::{Codec, Media};
use crate::stats::CounterSnapshot;
use crate::track::Track;

use super::{Consumer, ConsumerState, Lifecycle};

/// Raw payload consumer over an `AsyncWrite` (socket, pipe, file)
pub struct WriterConsumer<W> {
    format: String,
    medias: Vec<Media>,
    remote: Option<String>,
    lifecycle: Arc<Lifecycle>,
    writer: Arc<Mutex<W>>,
}

impl<W> WriterConsumer<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(medias: Vec<Media>, writer: W) -> Self {
        Self {
            format: "raw".to_string(),
            medias,
            remote: None,
            lifecycle: Lifecycle::new(),
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Name shown in introspection
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }
}

#[async_trait]
impl<W> Consumer for WriterConsumer<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn format_name(&self) -> &str {
        &self.format
    }

    fn medias(&self) -> Vec<Media> {
        self.medias.clone()
    }

    async fn add_track(&self, media: &Media, codec: &Codec, track: &Arc<Track>) -> Result<()> {
        let (binding, mut rx) = track.subscribe();
        self.lifecycle.hold(binding)?;

        let lifecycle = Arc::clone(&self.lifecycle);
        let writer = Arc::clone(&self.writer);
        let track_id = track.id();

        tracing::debug!(media = %media, codec = %codec, track = track_id, "Writer track bound");

        tokio::spawn(async move {
            loop {
                let packet = tokio::select! {
                    _ = lifecycle.token().cancelled() => break,
                    packet = rx.recv() => match packet {
                        Some(packet) => packet,
                        None => break,
                    },
                };

                let mut w = writer.lock().await;
                let written = async {
                    w.write_all(&packet.payload).await?;
                    w.flush().await
                }
                .await;

                if let Err(e) = written {
                    tracing::debug!(track = track_id, error = %e, "Consumer write failed, closing");
                    lifecycle.close();
                    break;
                }
                lifecycle.counters().add(packet.len());
            }
        });

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.lifecycle.close();
        let mut w = self.writer.lock().await;
        // Peer may already be gone
        let _ = w.shutdown().await;
        Ok(())
    }

    async fn closed(&self) {
        self.lifecycle.closed().await
    }

    fn state(&self) -> ConsumerState {
        self.lifecycle.state()
    }

    fn remote(&self) -> Option<String> {
        self.remote.clone()
    }

    fn send(&self) -> CounterSnapshot {
        self.lifecycle.counters().snapshot()
    }
}
