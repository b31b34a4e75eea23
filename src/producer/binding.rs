//! Producer binding: one configured source URL and its live connection
//!
//! Control operations (dial, attach, rebind, stop) are serialized by an async
//! `op` lock, so there is at most one connection attempt per binding at a
//! time. Plain state lives behind a `parking_lot` mutex that is never held
//! across an await.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::consumer::Consumer;
use crate::error::{Error, Result};
use crate::media::{Codec, Direction, Media};
use crate::registry::{Handlers, RegistryConfig};
use crate::stats::CounterSnapshot;
use crate::track::Track;

use super::{Producer, ProducerInfo, ProducerState, ReconnectPolicy};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Placeholder substituted by [`ProducerBinding::set_source`]
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Consumer-supplied track fed into the producer
#[derive(Clone)]
struct Sender {
    media: Media,
    codec: Codec,
    track: Arc<Track>,
}

struct State {
    url: String,
    template: Option<String>,
    phase: ProducerState,
    conn: Option<Arc<dyn Producer>>,
    medias: Vec<Media>,
    receivers: Vec<Arc<Track>>,
    senders: Vec<Sender>,
    /// Bumped on every teardown; a worker only acts for its own generation
    generation: u64,
    running: bool,
    last_error: Option<String>,
}

/// One producer slot of a stream
pub struct ProducerBinding {
    id: u64,
    always_on: AtomicBool,
    handlers: Arc<Handlers>,
    dial_timeout: Duration,
    setup_timeout: Duration,
    policy: ReconnectPolicy,
    op: tokio::sync::Mutex<()>,
    state: Mutex<State>,
}

impl ProducerBinding {
    pub fn new(
        url: impl Into<String>,
        always_on: bool,
        handlers: Arc<Handlers>,
        config: &RegistryConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed),
            always_on: AtomicBool::new(always_on),
            handlers,
            dial_timeout: config.dial_timeout,
            setup_timeout: config.setup_timeout,
            policy: config.reconnect.clone(),
            op: tokio::sync::Mutex::new(()),
            state: Mutex::new(State {
                url: url.into(),
                template: None,
                phase: ProducerState::Idle,
                conn: None,
                medias: Vec::new(),
                receivers: Vec::new(),
                senders: Vec::new(),
                generation: 0,
                running: false,
                last_error: None,
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    pub fn state(&self) -> ProducerState {
        self.state.lock().phase
    }

    pub fn always_on(&self) -> bool {
        self.always_on.load(Ordering::Relaxed)
    }

    /// Change the always-on flag; returns whether it changed
    pub fn set_always_on(&self, always_on: bool) -> bool {
        self.always_on.swap(always_on, Ordering::Relaxed) != always_on
    }

    /// Whether a live (or recovering) connection exists
    pub fn is_connected(&self) -> bool {
        self.state.lock().conn.is_some()
    }

    /// Medias of the live connection, without dialling
    pub fn connected_medias(&self) -> Option<Vec<Media>> {
        let st = self.state.lock();
        st.conn.as_ref().map(|_| st.medias.clone())
    }

    /// Tracks currently published by this binding
    pub fn tracks(&self) -> Vec<Arc<Track>> {
        self.state.lock().receivers.clone()
    }

    /// Substitute `input` into the URL template.
    ///
    /// The first call freezes the current URL as the template. Returns whether
    /// the effective URL changed; a live connection keeps running until the
    /// next dial.
    pub fn set_source(&self, input: &str) -> bool {
        let mut st = self.state.lock();
        if st.template.is_none() {
            st.template = Some(st.url.clone());
        }

        let next = st
            .template
            .as_deref()
            .unwrap_or_default()
            .replacen(INPUT_PLACEHOLDER, input, 1);
        if next == st.url {
            return false;
        }

        tracing::debug!(binding = self.id, url = %next, "Producer source patched");
        st.url = next;
        true
    }

    /// Medias of this source, dialling it first if needed
    pub async fn medias(&self) -> Result<Vec<Media>> {
        let _op = self.op.lock().await;
        self.connect_locked().await?;
        Ok(self.state.lock().medias.clone())
    }

    /// Feed `consumer` with this producer's track for `codec`.
    ///
    /// An existing track carrying the same codec is shared instead of asking
    /// the connection for a new one.
    pub async fn attach(
        &self,
        media: &Media,
        codec: &Codec,
        consumer: &Arc<dyn Consumer>,
        consumer_media: &Media,
    ) -> Result<Arc<Track>> {
        let _op = self.op.lock().await;
        let conn = self.connect_locked().await?;

        let track = match self.find_receiver(codec) {
            Some(track) => track,
            None => {
                let track = self.setup(conn.track(media, codec)).await?;
                let mut st = self.state.lock();
                st.receivers.push(Arc::clone(&track));
                st.medias = conn.medias();
                track
            }
        };

        self.setup(consumer.add_track(consumer_media, codec, &track)).await?;
        Ok(track)
    }

    /// Feed this producer with a track supplied by a consumer (backchannel)
    pub async fn attach_backchannel(&self, media: &Media, codec: &Codec, track: &Arc<Track>) -> Result<()> {
        let _op = self.op.lock().await;
        let conn = self.connect_locked().await?;
        self.setup(conn.add_track(media, codec, track)).await?;

        self.state.lock().senders.push(Sender {
            media: media.clone(),
            codec: codec.clone(),
            track: Arc::clone(track),
        });
        Ok(())
    }

    /// Start pumping packets; no-op if already running or not connected
    pub fn start(self: &Arc<Self>) {
        let generation = {
            let mut st = self.state.lock();
            if st.running || st.conn.is_none() {
                return;
            }
            st.running = true;
            st.generation
        };

        let binding = Arc::clone(self);
        tokio::spawn(async move { binding.run(generation).await });
    }

    /// Whether any consumer still reads from (or writes into) this binding
    pub fn has_readers(&self) -> bool {
        let st = self.state.lock();
        st.receivers.iter().any(|t| t.receiver_count() > 0)
            || st.senders.iter().any(|s| !s.track.is_closed())
    }

    /// Stop the connection and unbind every track
    pub async fn stop(&self) {
        let _op = self.op.lock().await;
        self.teardown_locked(None, None).await;
    }

    /// Stop unless readers remain or the binding is always on.
    ///
    /// Returns whether the binding was stopped.
    pub async fn stop_if_idle(&self) -> bool {
        let _op = self.op.lock().await;
        if self.always_on() || self.has_readers() || !self.is_connected() {
            return false;
        }

        tracing::debug!(binding = self.id, url = %self.url(), "Stopping idle producer");
        self.teardown_locked(None, None).await;
        true
    }

    pub fn info(&self) -> ProducerInfo {
        let st = self.state.lock();
        let recv = st.conn.as_ref().map(|c| c.recv()).unwrap_or_default();
        ProducerInfo {
            url: st.url.clone(),
            state: st.phase,
            format: st.conn.as_ref().map(|c| c.format_name().to_string()),
            medias: st.medias.iter().map(ToString::to_string).collect(),
            receivers: st.receivers.iter().map(|t| t.receiver_count()).sum(),
            recv,
            bitrate: recv.bitrate(),
            tracks: st
                .receivers
                .iter()
                .map(|t| t.stats())
                .fold(CounterSnapshot::default(), CounterSnapshot::merge),
            always_on: self.always_on(),
            error: st.last_error.clone(),
        }
    }

    async fn dial(&self, url: &str) -> Result<Arc<dyn Producer>> {
        match tokio::time::timeout(self.dial_timeout, self.handlers.open_producer(url)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("dialing producer")),
        }
    }

    /// One track setup call, bounded by the setup timeout
    async fn setup<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.setup_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(binding = self.id, timeout_ms = self.setup_timeout.as_millis() as u64, "Track setup timed out");
                Err(Error::Timeout("setting up track"))
            }
        }
    }

    /// Live connection, dialling if there is none. Caller holds `op`.
    async fn connect_locked(&self) -> Result<Arc<dyn Producer>> {
        let url = {
            let mut st = self.state.lock();
            if let Some(conn) = &st.conn {
                return Ok(Arc::clone(conn));
            }
            st.phase = ProducerState::Connecting;
            st.url.clone()
        };

        tracing::debug!(binding = self.id, url = %url, "Dialing producer");
        let started = Instant::now();

        match self.dial(&url).await {
            Ok(conn) => {
                let medias = conn.medias();
                tracing::info!(
                    binding = self.id,
                    url = %url,
                    format = conn.format_name(),
                    medias = medias.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Producer connected"
                );

                let mut st = self.state.lock();
                st.conn = Some(Arc::clone(&conn));
                st.medias = medias;
                st.phase = ProducerState::Connected;
                st.last_error = None;
                Ok(conn)
            }
            Err(e) => {
                tracing::warn!(binding = self.id, url = %url, error = %e, "Producer dial failed");

                let mut st = self.state.lock();
                st.phase = ProducerState::Stopped;
                st.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn find_receiver(&self, codec: &Codec) -> Option<Arc<Track>> {
        self.state
            .lock()
            .receivers
            .iter()
            .find(|t| !t.is_closed() && t.codec() == codec)
            .cloned()
    }

    fn current(&self, generation: u64) -> Option<Arc<dyn Producer>> {
        let st = self.state.lock();
        if st.generation != generation {
            return None;
        }
        st.conn.clone()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    async fn run(self: Arc<Self>, generation: u64) {
        let mut failures = 0u32;

        while let Some(conn) = self.current(generation) {
            let session = Instant::now();
            let result = conn.start().await;

            if !self.is_current(generation) {
                return;
            }

            match &result {
                Ok(()) => tracing::debug!(binding = self.id, "Producer finished"),
                Err(e) => tracing::warn!(binding = self.id, error = %e, "Producer interrupted"),
            }

            if let Err(e) = result {
                if !e.is_transient() {
                    self.fail(generation, e).await;
                    return;
                }
            }

            {
                let _op = self.op.lock().await;
                if !self.is_current(generation) {
                    return;
                }
                if !self.always_on() && !self.has_readers() {
                    tracing::debug!(binding = self.id, "Producer has no readers, not reconnecting");
                    self.teardown_locked(Some(generation), None).await;
                    return;
                }
            }

            // A session that dies right away counts as a failed attempt
            if session.elapsed() < self.policy.initial {
                failures += 1;
            } else {
                failures = 0;
            }

            match self.reconnect(generation, &mut failures).await {
                Ok(true) => continue,
                Ok(false) => return,
                Err(e) => {
                    self.fail(generation, e).await;
                    return;
                }
            }
        }
    }

    /// Dial again with backoff. `Ok(false)` means the binding was stopped
    /// meanwhile.
    async fn reconnect(&self, generation: u64, failures: &mut u32) -> Result<bool> {
        {
            let mut st = self.state.lock();
            if st.generation != generation {
                return Ok(false);
            }
            st.phase = ProducerState::Reconnecting;
        }

        loop {
            if *failures > 0 {
                if self.policy.exhausted(*failures) {
                    return Err(Error::Closed("producer after reconnect attempts"));
                }
                tokio::time::sleep(self.policy.delay(*failures)).await;
            }

            if !self.is_current(generation) {
                return Ok(false);
            }

            let url = self.url();
            tracing::debug!(binding = self.id, url = %url, attempt = *failures + 1, "Reconnecting producer");

            match self.dial(&url).await {
                Ok(conn) => return self.rebind(generation, conn).await,
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    *failures += 1;
                    tracing::warn!(binding = self.id, url = %url, attempt = *failures, error = %e, "Reconnect failed");
                    if self.policy.exhausted(*failures) {
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Move every bound track onto `conn` and retire the old connection
    async fn rebind(&self, generation: u64, conn: Arc<dyn Producer>) -> Result<bool> {
        let _op = self.op.lock().await;
        if !self.is_current(generation) {
            let _ = conn.stop().await;
            return Ok(false);
        }

        let medias = conn.medias();
        let (receivers, senders) = {
            let st = self.state.lock();
            (st.receivers.clone(), st.senders.clone())
        };

        let mut kept = Vec::with_capacity(receivers.len());
        for old in receivers {
            if old.is_closed() || old.receiver_count() == 0 {
                old.close();
                continue;
            }

            let matched = medias
                .iter()
                .filter(|m| {
                    m.kind == old.kind()
                        && matches!(m.direction, Direction::Recvonly | Direction::Sendrecv)
                })
                .find_map(|m| m.match_codec(old.codec()).map(|c| (m.clone(), c.clone())));

            let Some((media, codec)) = matched else {
                tracing::warn!(binding = self.id, codec = %old.codec(), "Codec gone after reconnect");
                old.close();
                continue;
            };

            match self.setup(conn.track(&media, &codec)).await {
                Ok(new) => {
                    old.replace(&new);
                    old.close();
                    kept.push(new);
                }
                Err(e) => {
                    tracing::warn!(binding = self.id, codec = %codec, error = %e, "Track lost after reconnect");
                    old.close();
                }
            }
        }

        let mut kept_senders = Vec::with_capacity(senders.len());
        for sender in senders {
            if sender.track.is_closed() {
                continue;
            }
            match self.setup(conn.add_track(&sender.media, &sender.codec, &sender.track)).await {
                Ok(()) => kept_senders.push(sender),
                Err(e) => {
                    tracing::warn!(binding = self.id, codec = %sender.codec, error = %e, "Backchannel lost after reconnect")
                }
            }
        }

        let old = {
            let mut st = self.state.lock();
            st.medias = conn.medias();
            st.receivers = kept;
            st.senders = kept_senders;
            st.phase = ProducerState::Connected;
            st.last_error = None;
            st.conn.replace(conn)
        };

        if let Some(old) = old {
            if let Err(e) = old.stop().await {
                tracing::debug!(binding = self.id, error = %e, "Old producer stop failed");
            }
        }

        tracing::info!(binding = self.id, url = %self.url(), "Producer reconnected");
        Ok(true)
    }

    async fn fail(&self, generation: u64, error: Error) {
        tracing::error!(binding = self.id, url = %self.url(), error = %error, "Producer stopped");
        let _op = self.op.lock().await;
        self.teardown_locked(Some(generation), Some(error.to_string())).await;
    }

    /// Caller holds `op`. With `only`, do nothing if another generation
    /// already took over.
    async fn teardown_locked(&self, only: Option<u64>, error: Option<String>) {
        let (conn, receivers) = {
            let mut st = self.state.lock();
            if only.is_some_and(|g| g != st.generation) {
                return;
            }

            st.generation += 1;
            st.running = false;
            if st.phase != ProducerState::Idle || st.conn.is_some() {
                st.phase = ProducerState::Stopped;
            }
            if error.is_some() {
                st.last_error = error;
            }
            st.senders.clear();
            st.medias.clear();
            (st.conn.take(), std::mem::take(&mut st.receivers))
        };

        for track in receivers {
            track.close();
        }

        if let Some(conn) = conn {
            if let Err(e) = conn.stop().await {
                tracing::debug!(binding = self.id, error = %e, "Producer stop failed");
            }
        }
    }
}

impl std::fmt::Debug for ProducerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.state.lock();
        f.debug_struct("ProducerBinding")
            .field("id", &self.id)
            .field("url", &st.url)
            .field("state", &st.phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::consumer::PacketSink;
    use crate::media::codec::{CODEC_AAC, CODEC_H264};
    use crate::media::{parse_query, Kind};
    use crate::track::Packet;

    struct FakeConn {
        medias: Vec<Media>,
        tracks: parking_lot::Mutex<Vec<Arc<Track>>>,
        done: CancellationToken,
        stopped: AtomicBool,
    }

    impl FakeConn {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                medias: vec![
                    Media::new(Kind::Video, Direction::Recvonly, vec![Codec::new(CODEC_H264)]),
                    Media::new(Kind::Audio, Direction::Recvonly, vec![Codec::new(CODEC_AAC)]),
                ],
                tracks: parking_lot::Mutex::new(Vec::new()),
                done: CancellationToken::new(),
                stopped: AtomicBool::new(false),
            })
        }

        fn drop_connection(&self) {
            self.done.cancel();
        }
    }

    #[async_trait]
    impl Producer for FakeConn {
        fn format_name(&self) -> &str {
            "fake"
        }

        fn medias(&self) -> Vec<Media> {
            self.medias.clone()
        }

        async fn track(&self, media: &Media, codec: &Codec) -> Result<Arc<Track>> {
            let track = Track::new(media, codec.clone());
            self.tracks.lock().push(Arc::clone(&track));
            Ok(track)
        }

        async fn start(&self) -> Result<()> {
            self.done.cancelled().await;
            Err(Error::Transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
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

    struct Harness {
        dials: Arc<AtomicUsize>,
        conns: Arc<parking_lot::Mutex<Vec<Arc<FakeConn>>>>,
        handlers: Arc<Handlers>,
    }

    fn harness() -> Harness {
        let dials = Arc::new(AtomicUsize::new(0));
        let conns: Arc<parking_lot::Mutex<Vec<Arc<FakeConn>>>> = Arc::default();

        let (d, c) = (Arc::clone(&dials), Arc::clone(&conns));
        let handlers = Handlers::new().producer("fake", move |_url: String| {
            d.fetch_add(1, Ordering::SeqCst);
            let conn = FakeConn::new();
            c.lock().push(Arc::clone(&conn));
            async move { Ok::<_, Error>(conn as Arc<dyn Producer>) }
        });

        Harness {
            dials,
            conns,
            handlers: Arc::new(handlers),
        }
    }

    fn config() -> RegistryConfig {
        RegistryConfig::default().reconnect(
            ReconnectPolicy::default()
                .initial(Duration::from_millis(10))
                .max_delay(Duration::from_millis(20)),
        )
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_lazy_dial_and_shared_track() {
        let h = harness();
        let binding = ProducerBinding::new("fake://cam", false, Arc::clone(&h.handlers), &config());
        assert_eq!(binding.state(), ProducerState::Idle);
        assert_eq!(h.dials.load(Ordering::SeqCst), 0);

        let medias = binding.medias().await.unwrap();
        assert_eq!(medias.len(), 2);
        assert_eq!(binding.state(), ProducerState::Connected);

        let first: Arc<dyn Consumer> = Arc::new(PacketSink::from_query("video"));
        let second: Arc<dyn Consumer> = Arc::new(PacketSink::from_query("video"));
        let request = parse_query("video").remove(0);
        let codec = Codec::new(CODEC_H264);

        let a = binding.attach(&medias[0], &codec, &first, &request).await.unwrap();
        let b = binding.attach(&medias[0], &codec, &second, &request).await.unwrap();

        assert_eq!(a.id(), b.id());
        assert_eq!(a.receiver_count(), 2);
        assert_eq!(h.dials.load(Ordering::SeqCst), 1);
        assert_eq!(binding.info().receivers, 2);

        let listener: Arc<dyn Consumer> = Arc::new(PacketSink::from_query("audio"));
        let audio_request = parse_query("audio").remove(0);
        let audio = binding
            .attach(&medias[1], &Codec::new(CODEC_AAC), &listener, &audio_request)
            .await
            .unwrap();
        a.write_packet(Packet::new(Bytes::from_static(b"idr"), 0));
        audio.write_packet(Packet::new(Bytes::from_static(b"aac"), 0));

        let info = binding.info();
        assert_eq!(info.tracks.packets, 2);
        assert_eq!(info.tracks.bytes, 6);
        assert_eq!(info.bitrate, 0);
    }

    #[tokio::test]
    async fn test_reconnect_moves_bindings() {
        let h = harness();
        let binding = ProducerBinding::new("fake://cam", false, Arc::clone(&h.handlers), &config());
        let medias = binding.medias().await.unwrap();

        let sink = Arc::new(PacketSink::from_query("video"));
        let consumer: Arc<dyn Consumer> = sink.clone();
        let request = parse_query("video").remove(0);
        binding
            .attach(&medias[0], &Codec::new(CODEC_H264), &consumer, &request)
            .await
            .unwrap();
        binding.start();

        let first = Arc::clone(&h.conns.lock()[0]);
        first.drop_connection();

        wait_for(|| h.conns.lock().len() == 2 && binding.state() == ProducerState::Connected).await;
        assert!(first.stopped.load(Ordering::SeqCst));

        let second = Arc::clone(&h.conns.lock()[1]);
        let track = Arc::clone(&second.tracks.lock()[0]);
        assert_eq!(track.receiver_count(), 1);

        track.write_packet(Packet::new(Bytes::from_static(b"after"), 0));
        let packet = sink.recv(Kind::Video).await.unwrap();
        assert_eq!(&packet.payload[..], b"after");

        binding.stop().await;
    }

    #[tokio::test]
    async fn test_stop_if_idle_releases_connection() {
        let h = harness();
        let binding = ProducerBinding::new("fake://cam", false, Arc::clone(&h.handlers), &config());
        let medias = binding.medias().await.unwrap();

        let consumer: Arc<dyn Consumer> = Arc::new(PacketSink::from_query("video"));
        let request = parse_query("video").remove(0);
        binding
            .attach(&medias[0], &Codec::new(CODEC_H264), &consumer, &request)
            .await
            .unwrap();
        binding.start();

        assert!(!binding.stop_if_idle().await);

        consumer.stop().await.unwrap();
        assert!(binding.stop_if_idle().await);
        assert_eq!(binding.state(), ProducerState::Stopped);
        assert!(h.conns.lock()[0].stopped.load(Ordering::SeqCst));
        assert!(binding.tracks().is_empty());
    }

    #[tokio::test]
    async fn test_always_on_survives_idle() {
        let h = harness();
        let binding = ProducerBinding::new("fake://cam", true, Arc::clone(&h.handlers), &config());
        binding.medias().await.unwrap();

        assert!(!binding.stop_if_idle().await);
        assert_eq!(binding.state(), ProducerState::Connected);
        assert!(binding.info().always_on);
    }

    #[tokio::test]
    async fn test_unknown_scheme_stops_binding() {
        let h = harness();
        let binding = ProducerBinding::new("nope://cam", false, Arc::clone(&h.handlers), &config());

        let err = binding.medias().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(binding.state(), ProducerState::Stopped);
        assert!(binding.info().error.is_some());
    }

    #[tokio::test]
    async fn test_dial_timeout() {
        let handlers = Handlers::new().producer("slow", |_url: String| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Err::<Arc<dyn Producer>, _>(Error::Closed("never"))
        });
        let config = config().dial_timeout(Duration::from_millis(20));
        let binding = ProducerBinding::new("slow://cam", false, Arc::new(handlers), &config);

        let err = binding.medias().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[test]
    fn test_set_source_template() {
        let h = harness();
        let binding = ProducerBinding::new(
            "fake://{input}?video",
            false,
            Arc::clone(&h.handlers),
            &config(),
        );

        assert!(binding.set_source("cam1"));
        assert_eq!(binding.url(), "fake://cam1?video");
        assert!(binding.set_source("cam2"));
        assert_eq!(binding.url(), "fake://cam2?video");
        assert!(!binding.set_source("cam2"));
    }
}
