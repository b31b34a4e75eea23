//! Tracks: negotiated elementary streams with fan-out
//!
//! A producer writes packets into a [`Track`]; every bound receiver gets its
//! own bounded queue.
//!
//! ```text
//!                 Arc<Track>
//!          ┌─────────────────────────┐
//!  writer ─┤ receivers: ArcSwap<[   ]├──► queue ──► consumer A
//!          │                         ├──► queue ──► consumer B
//!          │                         ├──► queue ──► consumer C
//!          └─────────────────────────┘
//! ```
//!
//! # Zero-Copy Design
//!
//! Packets carry `bytes::Bytes`, so queuing a packet for N receivers clones N
//! reference-counted handles, not N payloads.

pub mod binding;
pub mod packet;
#[allow(clippy::module_inception)]
pub mod track;

pub use binding::Binding;
pub use packet::Packet;
pub use track::{Track, TrackWriter};
