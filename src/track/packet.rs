//! Packets carried by tracks

use bytes::Bytes;

/// One unit of media on a track
///
/// Cheap to clone: the payload is reference counted, so fanning a packet out
/// to many receivers never copies the media bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Encoded media (zero-copy via reference counting)
    pub payload: Bytes,
    /// Timestamp in units of the track codec's clock rate
    pub timestamp: u32,
    /// Sequence number as emitted by the producer
    pub sequence: u16,
    /// End of an access unit / frame
    pub marker: bool,
    /// Whether the packet starts a decodable picture
    pub keyframe: bool,
}

impl Packet {
    /// Create a packet with no flags set
    pub fn new(payload: impl Into<Bytes>, timestamp: u32) -> Self {
        Self {
            payload: payload.into(),
            timestamp,
            sequence: 0,
            marker: false,
            keyframe: false,
        }
    }

    pub fn with_sequence(mut self, sequence: u16) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_marker(mut self, marker: bool) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_keyframe(mut self, keyframe: bool) -> Self {
        self.keyframe = keyframe;
        self
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
