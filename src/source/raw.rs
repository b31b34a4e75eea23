//! Chunk pump shared by the byte-stream sources

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::media::{Codec, Media};
use crate::producer::Producer;
use crate::stats::{CounterSnapshot, Counters};
use crate::track::{Packet, Track};

use super::SourceOptions;

type Reader = Box<dyn AsyncRead + Send + Unpin>;

/// Producer publishing every read chunk of a byte stream as one packet
pub struct RawProducer {
    format: &'static str,
    media: Media,
    options: SourceOptions,
    reader: tokio::sync::Mutex<Option<Reader>>,
    process: tokio::sync::Mutex<Option<Child>>,
    track: Mutex<Option<Arc<Track>>>,
    cancel: CancellationToken,
    counters: Counters,
}

impl RawProducer {
    pub fn new(format: &'static str, media: Media, reader: Reader, options: SourceOptions) -> Self {
        Self {
            format,
            media,
            options,
            reader: tokio::sync::Mutex::new(Some(reader)),
            process: tokio::sync::Mutex::new(None),
            track: Mutex::new(None),
            cancel: CancellationToken::new(),
            counters: Counters::new(),
        }
    }

    /// Tie a subprocess to this producer; it is killed on stop
    pub fn with_process(mut self, child: Child) -> Self {
        self.process = tokio::sync::Mutex::new(Some(child));
        self
    }

    fn output(&self) -> Arc<Track> {
        let mut slot = self.track.lock();
        match slot.as_ref() {
            Some(track) => Arc::clone(track),
            None => {
                let codec = self.media.codecs.first().cloned().unwrap_or_else(Codec::any);
                let track = Track::new(&self.media, codec);
                *slot = Some(Arc::clone(&track));
                track
            }
        }
    }
}

#[async_trait]
impl Producer for RawProducer {
    fn format_name(&self) -> &str {
        self.format
    }

    fn medias(&self) -> Vec<Media> {
        vec![self.media.clone()]
    }

    async fn track(&self, media: &Media, codec: &Codec) -> Result<Arc<Track>> {
        if media.kind != self.media.kind || self.media.match_codec(codec).is_none() {
            return Err(Error::Unsupported("media not offered by this source"));
        }
        Ok(self.output())
    }

    async fn start(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        let mut reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or(Error::Closed("source"))?;

        let writer = self.output().writer()?;
        let mut buf = BytesMut::with_capacity(self.options.buffer_size);
        let started = Instant::now();
        let mut sequence: u16 = 0;

        loop {
            buf.reserve(self.options.buffer_size);

            let read = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                read = tokio::time::timeout(self.options.read_deadline, reader.read_buf(&mut buf)) => read,
            };

            let n = match read {
                Ok(Ok(0)) => {
                    tracing::debug!(format = self.format, "Source reached end of stream");
                    return Ok(());
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(Error::Transport(e)),
                Err(_) => return Err(Error::Timeout("reading source")),
            };

            self.counters.add(n);
            let payload = buf.split().freeze();
            let packet = Packet::new(payload, timestamp(started.elapsed(), writer.track().codec()))
                .with_sequence(sequence);
            sequence = sequence.wrapping_add(1);
            writer.write(packet);
        }
    }

    async fn stop(&self) -> Result<()> {
        self.cancel.cancel();
        self.reader.lock().await.take();

        if let Some(mut child) = self.process.lock().await.take() {
            // Already exited is fine
            let _ = child.kill().await;
        }

        if let Some(track) = self.track.lock().take() {
            track.close();
        }
        Ok(())
    }

    fn recv(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

/// Elapsed time in the codec's clock units (milliseconds if it has none)
fn timestamp(elapsed: Duration, codec: &Codec) -> u32 {
    let rate = if codec.clock_rate() > 0 { codec.clock_rate() as u128 } else { 1000 };
    (elapsed.as_millis() * rate / 1000) as u32
}
