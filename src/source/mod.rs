//! Built-in producers for raw byte sources
//!
//! - `exec:<command>#<media>`: stdout of a subprocess (e.g. an external
//!   encoder writing MJPEG to a pipe)
//! - `tcp://host:port#<media>`: bytes read from a TCP socket
//!
//! The fragment is a media query (`video=mjpeg`, `audio=pcmu`, ...)
//! declaring what the bytes are; without it the source publishes
//! `application/RAW`. Both read in chunks of up to
//! [`SourceOptions::buffer_size`] bytes and give up on a read that takes
//! longer than [`SourceOptions::read_deadline`].

use std::time::Duration;

use crate::error::ConfigError;
use crate::media::codec::{codec_kind, CODEC_RAW};
use crate::media::{parse_query, Codec, Direction, Kind, Media};
use crate::registry::Handlers;

pub mod exec;
pub mod raw;
pub mod tcp;

pub use raw::RawProducer;

/// Default read buffer size (64KB)
pub const BUFFER_SIZE: usize = 64 * 1024;

/// I/O tuning for the built-in sources
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Bound on establishing the connection
    pub dial_timeout: Duration,

    /// A read taking longer than this fails the session
    pub read_deadline: Duration,

    /// Maximum chunk size published as one packet
    pub buffer_size: usize,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(3),
            read_deadline: Duration::from_secs(5),
            buffer_size: BUFFER_SIZE,
        }
    }
}

impl SourceOptions {
    /// Set dial timeout
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set read deadline
    pub fn read_deadline(mut self, deadline: Duration) -> Self {
        self.read_deadline = deadline;
        self
    }

    /// Set buffer size
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }
}

/// Add the `exec` and `tcp` producer factories to `handlers`
pub fn register(handlers: Handlers, options: SourceOptions) -> Handlers {
    let exec_options = options.clone();
    handlers
        .producer("exec", move |url: String| exec::open_with(url, exec_options.clone()))
        .producer("tcp", move |url: String| tcp::open_with(url, options.clone()))
}

/// Split `url#media-query` into the URL and its single declared media
pub(crate) fn split_media(url: &str) -> std::result::Result<(&str, Media), ConfigError> {
    let (base, fragment) = match url.rsplit_once('#') {
        Some((base, fragment)) => (base, fragment),
        None => (url, ""),
    };

    let invalid = |reason: &str| ConfigError::InvalidSource {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let mut medias = parse_query(fragment);
    let media = match medias.len() {
        0 => Media::new(Kind::Application, Direction::Recvonly, vec![Codec::new(CODEC_RAW)]),
        1 => medias.remove(0),
        _ => return Err(invalid("a raw source carries a single media")),
    };

    if media.codecs.iter().any(Codec::is_wildcard) {
        return Err(invalid("source media needs a concrete codec"));
    }
    if media
        .codecs
        .iter()
        .any(|c| codec_kind(c.name()).is_some_and(|kind| kind != media.kind))
    {
        return Err(invalid("codec does not fit the media kind"));
    }

    Ok((base, Media::new(media.kind, Direction::Recvonly, media.codecs)))
}
