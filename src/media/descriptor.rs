//! Media descriptors and the matching primitive
//!
//! A [`Media`] is a declared (producer) or requested (consumer) capability:
//! one kind, one direction and an ordered list of codec candidates.
//!
//! Directions are written from the owner's point of view, the same way SDP
//! does it:
//!
//! ```text
//!   producer media          consumer media
//!   recvonly  ──────────▶   sendonly        forward flow (we read the source)
//!   sendonly  ◀──────────   recvonly        backchannel (client talks back)
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ConfigError, Error};

use super::codec::{Codec, CODEC_ALL};

/// Media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Video,
    Audio,
    Application,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Video => "video",
            Kind::Audio => "audio",
            Kind::Application => "application",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Kind::Video),
            "audio" => Ok(Kind::Audio),
            "application" | "data" => Ok(Kind::Application),
            other => Err(ConfigError::InvalidSource {
                url: other.to_string(),
                reason: "unknown media kind".into(),
            }
            .into()),
        }
    }
}

/// Media direction, from the owner's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Owner produces data that can be received from it
    Recvonly,
    /// Owner accepts data sent to it
    Sendonly,
    Sendrecv,
    /// Declared but unusable (`none`)
    Inactive,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Recvonly => "recvonly",
            Direction::Sendonly => "sendonly",
            Direction::Sendrecv => "sendrecv",
            Direction::Inactive => "inactive",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way packets travel once a producer media is paired with a consumer media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Producer track feeds the consumer
    Forward,
    /// Consumer track feeds the producer
    Backchannel,
}

/// Pair a producer direction with a consumer direction
pub fn flow(producer: Direction, consumer: Direction) -> Option<Flow> {
    use Direction::*;

    match (producer, consumer) {
        (Recvonly, Sendonly) | (Recvonly, Sendrecv) | (Sendrecv, Sendonly) => Some(Flow::Forward),
        (Sendonly, Recvonly) | (Sendonly, Sendrecv) | (Sendrecv, Recvonly) => {
            Some(Flow::Backchannel)
        }
        (Sendrecv, Sendrecv) => Some(Flow::Forward),
        _ => None,
    }
}

/// A declared or requested capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Media {
    pub kind: Kind,
    pub direction: Direction,
    /// Candidates in preference order
    pub codecs: Vec<Codec>,
}

impl Media {
    pub fn new(kind: Kind, direction: Direction, codecs: Vec<Codec>) -> Self {
        Self {
            kind,
            direction,
            codecs,
        }
    }

    /// Whether the request asks for every compatible codec (`ALL`)
    pub fn matches_all(&self) -> bool {
        self.codecs.iter().any(|c| c.name() == CODEC_ALL)
    }

    /// First codec of this media that can carry `requested`
    pub fn match_codec(&self, requested: &Codec) -> Option<&Codec> {
        self.codecs.iter().find(|c| c.matches(requested))
    }
}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.kind, self.direction)?;
        for codec in &self.codecs {
            write!(f, ", {}", codec)?;
        }
        Ok(())
    }
}

/// Find the producer media and concrete codec that satisfy a consumer request.
///
/// Producer medias are tried in declared order; within each, the consumer's
/// codecs are tried in preference order and the first compatible pair wins.
/// Returns `None` when nothing is compatible; this never transcodes.
pub fn match_media<'a>(consumer: &Media, producers: &'a [Media]) -> Option<(&'a Media, &'a Codec)> {
    for media in producers {
        if media.kind != consumer.kind || flow(media.direction, consumer.direction).is_none() {
            continue;
        }

        for requested in &consumer.codecs {
            if let Some(codec) = media.match_codec(requested) {
                return Some((media, codec));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::codec::*;

    fn camera() -> Vec<Media> {
        vec![
            Media::new(
                Kind::Video,
                Direction::Recvonly,
                vec![Codec::new(CODEC_H264).with_clock_rate(90000).with_fmtp("profile-level-id=42e01f")],
            ),
            Media::new(
                Kind::Audio,
                Direction::Recvonly,
                vec![
                    Codec::new(CODEC_PCMA).with_clock_rate(8000),
                    Codec::new(CODEC_AAC).with_clock_rate(16000),
                ],
            ),
            Media::new(
                Kind::Audio,
                Direction::Sendonly,
                vec![Codec::new(CODEC_PCMA).with_clock_rate(8000)],
            ),
        ]
    }

    #[test]
    fn test_match_exact_codec() {
        let medias = camera();
        let request = Media::new(Kind::Video, Direction::Sendonly, vec![Codec::new(CODEC_H264)]);

        let (media, codec) = match_media(&request, &medias).unwrap();
        assert_eq!(media.kind, Kind::Video);
        assert_eq!(codec.name(), CODEC_H264);
    }

    #[test]
    fn test_match_respects_consumer_preference() {
        let medias = camera();
        let request = Media::new(
            Kind::Audio,
            Direction::Sendonly,
            vec![Codec::new(CODEC_AAC), Codec::new(CODEC_PCMA)],
        );

        let (_, codec) = match_media(&request, &medias).unwrap();
        assert_eq!(codec.name(), CODEC_AAC);
    }

    #[test]
    fn test_match_any_takes_first_producer_codec() {
        let medias = camera();
        let request = Media::new(Kind::Audio, Direction::Sendonly, vec![Codec::any()]);

        let (_, codec) = match_media(&request, &medias).unwrap();
        assert_eq!(codec.name(), CODEC_PCMA);
    }

    #[test]
    fn test_no_match_on_kind_or_codec() {
        let medias = camera();

        let vp8 = Media::new(Kind::Video, Direction::Sendonly, vec![Codec::new(CODEC_VP8)]);
        assert!(match_media(&vp8, &medias).is_none());

        let high = Media::new(
            Kind::Video,
            Direction::Sendonly,
            vec![Codec::new(CODEC_H264).with_fmtp("profile-level-id=640028")],
        );
        assert!(match_media(&high, &medias).is_none());

        let data = Media::new(Kind::Application, Direction::Sendonly, vec![Codec::any()]);
        assert!(match_media(&data, &medias).is_none());
    }

    #[test]
    fn test_backchannel_direction() {
        let medias = camera();
        let mic = Media::new(Kind::Audio, Direction::Recvonly, vec![Codec::any()]);

        let (media, codec) = match_media(&mic, &medias).unwrap();
        assert_eq!(media.direction, Direction::Sendonly);
        assert_eq!(codec.name(), CODEC_PCMA);
    }

    #[test]
    fn test_match_is_deterministic() {
        let medias = camera();
        let request = Media::new(Kind::Audio, Direction::Sendonly, vec![Codec::any()]);

        let first = match_media(&request, &medias).map(|(m, c)| (m.clone(), c.clone()));
        for _ in 0..100 {
            let again = match_media(&request, &medias).map(|(m, c)| (m.clone(), c.clone()));
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_match_never_false_positive() {
        let medias = camera();
        let names = [CODEC_H264, CODEC_VP8, CODEC_PCMA, CODEC_AAC, CODEC_OPUS, CODEC_ANY];

        for kind in [Kind::Video, Kind::Audio] {
            for name in names {
                let request = Media::new(kind, Direction::Sendonly, vec![Codec::new(name)]);
                if let Some((media, codec)) = match_media(&request, &medias) {
                    assert_eq!(media.kind, kind);
                    assert!(codec.matches(&request.codecs[0]));
                    assert!(media.codecs.contains(codec));
                }
            }
        }
    }

    #[test]
    fn test_flow_pairs() {
        assert_eq!(flow(Direction::Recvonly, Direction::Sendonly), Some(Flow::Forward));
        assert_eq!(flow(Direction::Sendonly, Direction::Recvonly), Some(Flow::Backchannel));
        assert_eq!(flow(Direction::Recvonly, Direction::Recvonly), None);
        assert_eq!(flow(Direction::Inactive, Direction::Sendonly), None);
    }

    #[test]
    fn test_display() {
        let media = &camera()[0];
        assert_eq!(media.to_string(), "video, recvonly, H264/90000");
    }
}
