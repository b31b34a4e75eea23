//! Media request query language
//!
//! Clients describe what they want as a URL query, for example
//! `video=H264,copy&audio=AAC&microphone`. Each `video`/`audio` value becomes
//! one requested media whose codec list keeps the left-to-right order.

use super::codec::*;
use super::descriptor::{Direction, Kind, Media};

/// Parse a raw query string (without the leading `?`)
pub fn parse_query(query: &str) -> Vec<Media> {
    let pairs = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes());
    parse_query_pairs(pairs)
}

/// Parse already-split `key=value` pairs, keeping their order
pub fn parse_query_pairs<I, K, V>(pairs: I) -> Vec<Media>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut medias = Vec::new();

    for (key, value) in pairs {
        let (kind, direction) = match key.as_ref() {
            "video" => (Kind::Video, Direction::Sendonly),
            "audio" => (Kind::Audio, Direction::Sendonly),
            "microphone" => (Kind::Audio, Direction::Recvonly),
            _ => continue,
        };

        let codecs = value.as_ref().split(',').map(codec_alias).collect();
        medias.push(Media::new(kind, direction, codecs));
    }

    medias
}

fn codec_alias(name: &str) -> Codec {
    let name = name.trim().to_ascii_uppercase();
    let name = match name.as_str() {
        "" | "COPY" | "ANY" => CODEC_ANY,
        "ALL" => CODEC_ALL,
        "MJPEG" => CODEC_JPEG,
        "AAC" => CODEC_AAC,
        "MP3" => CODEC_MP3,
        "PCM" => CODEC_PCM,
        other => return Codec::new(other),
    };
    Codec::new(name)
}
