//! mediagate: stream negotiation and media routing core
//!
//! This library routes media from producers (cameras, pipes, sockets) to
//! consumers (players, recorders, relays) by stream name:
//! - Codec/direction matching between what a client asks for and what the
//!   sources offer
//! - Lazy producer connections, shared by every consumer of a stream
//! - Reconnect with backoff, rebinding existing consumers onto the new tracks
//! - Idle shutdown once the last consumer goes away
//! - Pluggable protocols through per-scheme producer and consumer factories
//!
//! # Example: Relay a subprocess
//!
//! ```no_run
//! use std::sync::Arc;
//! use mediagate::{source, Handlers, PacketSink, StreamRegistry, StreamsConfig};
//! use mediagate::media::Kind;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handlers = source::register(Handlers::new(), Default::default());
//!     let registry = Arc::new(StreamRegistry::new(handlers));
//!
//!     let config = StreamsConfig::new()
//!         .stream("camera", ["exec:ffmpeg -i /dev/video0 -f mjpeg -#video=mjpeg"]);
//!     registry.load(&config).await;
//!
//!     let stream = registry.get("camera").await?;
//!     let sink = Arc::new(PacketSink::from_query("video=mjpeg"));
//!     stream.add_consumer(sink.clone()).await?;
//!
//!     while let Some(packet) = sink.recv(Kind::Video).await {
//!         println!("frame: {} bytes", packet.len());
//!     }
//!
//!     registry.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod consumer;
pub mod error;
pub mod media;
pub mod producer;
pub mod registry;
pub mod source;
pub mod stats;
pub mod stream;
pub mod track;

// Re-export main types for convenience
pub use error::{ConfigError, Error, NegotiationError, Result};
pub use consumer::{Consumer, ConsumerFactory, ConsumerRequest, PacketSink, WriterConsumer};
pub use media::{Codec, Direction, Kind, Media};
pub use producer::{Producer, ProducerBinding, ProducerFactory, ProducerState, ReconnectPolicy};
pub use registry::{Handlers, RegistryConfig, RegistryError, SourceSpec, StreamRegistry, StreamsConfig};
pub use stream::{Stream, StreamInfo};
pub use track::{Packet, Track};
