//! Streams: named routing units
//!
//! A [`Stream`] owns an ordered list of producer bindings and the consumers
//! currently attached to it. Negotiation, source changes and idle stops take
//! turns on the stream's control lock; the consumer table has its own lock
//! that is never held across producer or consumer I/O, so introspection and
//! removal stay responsive while a setup is pending. Packets never touch
//! either lock, they flow through the tracks.
//!
//! ```text
//!   consumer ──► add_consumer ──► negotiate ──► ProducerBinding::attach
//!                                    │                 │
//!                                    │           dial (lazy), track
//!                                    ▼                 ▼
//!                              links recorded    Track ──► consumer queue
//! ```
//!
//! When the last reader of a binding leaves, the binding is stopped unless it
//! is configured `always_on`.

pub mod info;
mod negotiate;
#[allow(clippy::module_inception)]
pub mod stream;

pub use info::StreamInfo;
pub use stream::Stream;
