//! Protocol-agnostic media model
//!
//! This module provides:
//! - Codec descriptors and the codec compatibility relation
//! - Media descriptors (kind, direction, codec candidates) and `match_media`
//! - The `video=...&audio=...` request query language
//! - H.264 profile-level-id handling used by negotiation
//!
//! Nothing here performs I/O.

pub mod codec;
pub mod descriptor;
pub mod h264;
pub mod query;

pub use codec::{codec_kind, Codec};
pub use descriptor::{flow, match_media, Direction, Flow, Kind, Media};
pub use h264::ProfileLevelId;
pub use query::{parse_query, parse_query_pairs};
