//! Scriptable producers for routing tests
//!
//! `mock://<name>#<query>` dials a [`MockConn`] offering the medias of the
//! query (`video=h264&audio=aac`, `microphone=pcmu` for a backchannel).

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use mediagate::media::{parse_query, Direction};
use mediagate::stats::CounterSnapshot;
use mediagate::{
    Codec, Error, Handlers, Kind, Media, Packet, Producer, ReconnectPolicy, RegistryConfig, Result,
    StreamRegistry, Track,
};

/// One dialled mock connection
pub struct MockConn {
    pub url: String,
    medias: Vec<Media>,
    tracks: Mutex<Vec<Arc<Track>>>,
    added: Mutex<Vec<Arc<Track>>>,
    done: CancellationToken,
    pub stopped: AtomicBool,
}

impl MockConn {
    fn new(url: &str) -> Arc<Self> {
        let query = url.split_once('#').map(|(_, q)| q).unwrap_or("");
        let medias = parse_query(query)
            .into_iter()
            .map(|m| {
                let direction = match m.direction {
                    Direction::Recvonly => Direction::Sendonly,
                    _ => Direction::Recvonly,
                };
                Media::new(m.kind, direction, m.codecs)
            })
            .collect();

        Arc::new(Self {
            url: url.to_string(),
            medias,
            tracks: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
            done: CancellationToken::new(),
            stopped: AtomicBool::new(false),
        })
    }

    /// Simulate the remote end hanging up
    pub fn drop_connection(&self) {
        self.done.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Tracks handed out so far
    pub fn tracks(&self) -> Vec<Arc<Track>> {
        self.tracks.lock().clone()
    }

    /// Backchannel tracks fed into this connection
    pub fn added(&self) -> Vec<Arc<Track>> {
        self.added.lock().clone()
    }

    /// Write one packet on the first track of `kind`; returns receivers reached
    pub fn write(&self, kind: Kind, payload: &'static [u8]) -> usize {
        let track = self.tracks.lock().iter().find(|t| t.kind() == kind).cloned();
        match track {
            Some(track) => track.write_packet(Packet::new(Bytes::from_static(payload), 0)),
            None => 0,
        }
    }
}

#[async_trait]
impl Producer for MockConn {
    fn format_name(&self) -> &str {
        "mock"
    }

    fn medias(&self) -> Vec<Media> {
        self.medias.clone()
    }

    async fn track(&self, media: &Media, codec: &Codec) -> Result<Arc<Track>> {
        let track = Track::new(media, codec.clone());
        self.tracks.lock().push(Arc::clone(&track));
        Ok(track)
    }

    async fn add_track(&self, _media: &Media, _codec: &Codec, track: &Arc<Track>) -> Result<()> {
        self.added.lock().push(Arc::clone(track));
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.done.cancelled().await;
        Err(Error::Transport(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "mock connection dropped",
        )))
    }

    async fn stop(&self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.done.cancel();
        Ok(())
    }

    fn recv(&self) -> CounterSnapshot {
        CounterSnapshot::default()
    }
}

/// Dial bookkeeping shared with the `mock` factory
#[derive(Default)]
pub struct Mock {
    conns: Mutex<Vec<Arc<MockConn>>>,
    dials: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
    dial_delay: Mutex<Duration>,
}

impl Mock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Handlers with the `mock` scheme wired to this instance
    pub fn handlers(self: &Arc<Self>) -> Handlers {
        let mock = Arc::clone(self);
        Handlers::new().producer("mock", move |url: String| {
            let mock = Arc::clone(&mock);
            async move { mock.dial(url).await }
        })
    }

    /// Registry over [`Mock::handlers`] with fast reconnects
    pub fn registry(self: &Arc<Self>) -> Arc<StreamRegistry> {
        Arc::new(StreamRegistry::with_config(self.handlers(), fast_config()))
    }

    async fn dial(&self, url: String) -> Result<Arc<dyn Producer>> {
        *self.dials.lock().entry(url.clone()).or_default() += 1;

        let delay = *self.dial_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().contains(&url) {
            return Err(Error::Transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock refused",
            )));
        }

        let conn = MockConn::new(&url);
        self.conns.lock().push(Arc::clone(&conn));
        Ok(conn)
    }

    /// Make every dial of `url` fail
    pub fn fail(&self, url: &str) {
        self.failing.lock().insert(url.to_string());
    }

    pub fn slow_dials(&self, delay: Duration) {
        *self.dial_delay.lock() = delay;
    }

    pub fn dials(&self, url: &str) -> usize {
        self.dials.lock().get(url).copied().unwrap_or(0)
    }

    /// Connections dialled for `url`, oldest first
    pub fn conns(&self, url: &str) -> Vec<Arc<MockConn>> {
        self.conns.lock().iter().filter(|c| c.url == url).cloned().collect()
    }

    pub fn latest(&self, url: &str) -> Option<Arc<MockConn>> {
        self.conns(url).pop()
    }
}

pub fn fast_config() -> RegistryConfig {
    RegistryConfig::default().dial_timeout(Duration::from_secs(1)).reconnect(
        ReconnectPolicy::default()
            .initial(Duration::from_millis(10))
            .max_delay(Duration::from_millis(20)),
    )
}

/// Poll `check` until it holds, failing the test after two seconds
pub async fn wait_for(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
