//! `tcp://` source: read bytes from a socket

use std::sync::Arc;

use tokio::net::TcpStream;
use url::Url;

use crate::error::{ConfigError, Error, Result};
use crate::producer::Producer;

use super::{split_media, RawProducer, SourceOptions};

/// Connect to `url` with default options
pub async fn open(url: String) -> Result<Arc<dyn Producer>> {
    open_with(url, SourceOptions::default()).await
}

/// Connect to `tcp://host:port[#<media query>]` and publish what it sends
pub async fn open_with(url: String, options: SourceOptions) -> Result<Arc<dyn Producer>> {
    let (base, media) = split_media(&url)?;

    let parsed = Url::parse(base).map_err(|_| ConfigError::MalformedUrl(url.clone()))?;
    let invalid = |reason: &str| ConfigError::InvalidSource {
        url: url.clone(),
        reason: reason.to_string(),
    };
    let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;
    let port = parsed.port().ok_or_else(|| invalid("missing port"))?;
    let addr = format!("{}:{}", host.trim_start_matches('[').trim_end_matches(']'), port);

    let socket = tokio::time::timeout(options.dial_timeout, TcpStream::connect(addr.as_str()))
        .await
        .map_err(|_| Error::Timeout("dialing tcp"))??;
    socket.set_nodelay(true)?;

    tracing::info!(addr = %addr, media = %media, "Source connected");

    Ok(Arc::new(RawProducer::new("tcp", media, Box::new(socket), options)))
}
