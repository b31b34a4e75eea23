//! Codec descriptors
//!
//! A [`Codec`] names one concrete encoding plus the parameters that decide
//! whether two endpoints can exchange it without transcoding.

use std::fmt;

use serde::Serialize;

use super::h264::ProfileLevelId;
use super::Kind;

pub const CODEC_H264: &str = "H264";
pub const CODEC_H265: &str = "H265";
pub const CODEC_VP8: &str = "VP8";
pub const CODEC_VP9: &str = "VP9";
pub const CODEC_AV1: &str = "AV1";
pub const CODEC_JPEG: &str = "JPEG";
pub const CODEC_RAW: &str = "RAW";

pub const CODEC_PCMU: &str = "PCMU";
pub const CODEC_PCMA: &str = "PCMA";
pub const CODEC_AAC: &str = "MPEG4-GENERIC";
pub const CODEC_OPUS: &str = "OPUS";
pub const CODEC_G722: &str = "G722";
pub const CODEC_MP3: &str = "MPA";
pub const CODEC_PCM: &str = "L16";
pub const CODEC_FLAC: &str = "FLAC";

/// Wildcard: first compatible codec of the requested kind
pub const CODEC_ANY: &str = "ANY";
/// Wildcard: every compatible codec of the requested kind
pub const CODEC_ALL: &str = "ALL";

/// Kind implied by a codec name, if it is one we know
pub fn codec_kind(name: &str) -> Option<Kind> {
    match name {
        CODEC_H264 | CODEC_H265 | CODEC_VP8 | CODEC_VP9 | CODEC_AV1 | CODEC_JPEG | CODEC_RAW => {
            Some(Kind::Video)
        }
        CODEC_PCMU | CODEC_PCMA | CODEC_AAC | CODEC_OPUS | CODEC_G722 | CODEC_MP3 | CODEC_PCM
        | CODEC_FLAC => Some(Kind::Audio),
        _ => None,
    }
}

/// An immutable codec descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Codec {
    name: String,
    clock_rate: u32,
    channels: u16,
    fmtp_line: String,
    payload_type: u8,
}

impl Codec {
    /// Create a codec with the given name and no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clock_rate: 0,
            channels: 0,
            fmtp_line: String::new(),
            payload_type: 0,
        }
    }

    /// Wildcard codec matching anything of the media's kind
    pub fn any() -> Self {
        Self::new(CODEC_ANY)
    }

    pub fn with_clock_rate(mut self, clock_rate: u32) -> Self {
        self.clock_rate = clock_rate;
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_fmtp(mut self, fmtp_line: impl Into<String>) -> Self {
        self.fmtp_line = fmtp_line.into();
        self
    }

    pub fn with_payload_type(mut self, payload_type: u8) -> Self {
        self.payload_type = payload_type;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn fmtp_line(&self) -> &str {
        &self.fmtp_line
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    /// True for `ANY` and `ALL`
    pub fn is_wildcard(&self) -> bool {
        self.name == CODEC_ANY || self.name == CODEC_ALL
    }

    /// Human-facing name (`AAC` rather than `MPEG4-GENERIC`)
    pub fn print_name(&self) -> &str {
        match self.name.as_str() {
            CODEC_AAC => "AAC",
            CODEC_MP3 => "MP3",
            CODEC_PCM => "PCM",
            name => name,
        }
    }

    /// Value of one `key=value` pair from the fmtp line
    pub fn fmtp_param(&self, key: &str) -> Option<&str> {
        self.fmtp_line.split(';').find_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            k.trim().eq_ignore_ascii_case(key).then(|| v.trim())
        })
    }

    /// Whether this concrete codec can be delivered to a consumer asking for
    /// `requested` without transcoding.
    pub fn matches(&self, requested: &Codec) -> bool {
        if requested.is_wildcard() {
            return true;
        }

        self.name == requested.name
            && (self.clock_rate == 0
                || requested.clock_rate == 0
                || self.clock_rate == requested.clock_rate)
            && (self.channels == 0 || requested.channels == 0 || self.channels == requested.channels)
            && self.params_compatible(requested)
    }

    fn params_compatible(&self, other: &Codec) -> bool {
        match self.name.as_str() {
            CODEC_H264 => {
                let profiles = match (
                    self.fmtp_param("profile-level-id"),
                    other.fmtp_param("profile-level-id"),
                ) {
                    (Some(a), Some(b)) => match (a.parse::<ProfileLevelId>(), b.parse::<ProfileLevelId>()) {
                        (Ok(a), Ok(b)) => a == b,
                        _ => a.eq_ignore_ascii_case(b),
                    },
                    _ => true,
                };
                profiles && self.same_param(other, "packetization-mode")
            }
            CODEC_H265 => self.same_param(other, "profile-id") && self.same_param(other, "tier-flag"),
            CODEC_VP9 => self.same_param(other, "profile-id"),
            _ => true,
        }
    }

    /// Parameters only conflict when both sides declare them
    fn same_param(&self, other: &Codec, key: &str) -> bool {
        match (self.fmtp_param(key), other.fmtp_param(key)) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => true,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.print_name())?;
        if self.clock_rate != 0 {
            write!(f, "/{}", self.clock_rate)?;
        }
        if self.channels > 1 {
            write!(f, "/{}", self.channels)?;
        }
        Ok(())
    }
}
