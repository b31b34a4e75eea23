//! Stream registry implementation
//!
//! The process-wide table of named streams. Several names may point at the
//! same [`Stream`] (aliases); configured streams are built lazily on first
//! access.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::producer::{ProducerInfo, ProducerState};
use crate::stats::CounterSnapshot;
use crate::stream::{Stream, StreamInfo};

use super::config::{RegistryConfig, SourceSpec, StreamsConfig};
use super::error::RegistryError;
use super::handlers::Handlers;

#[derive(Default)]
struct Tables {
    /// Built streams; alias names share the same `Arc`
    streams: HashMap<String, Arc<Stream>>,
    /// Configured streams not built yet
    pending: HashMap<String, Vec<SourceSpec>>,
    /// Names that cleanup never removes
    persistent: HashSet<String>,
}

impl Tables {
    fn knows(&self, name: &str) -> bool {
        self.streams.contains_key(name) || self.pending.contains_key(name)
    }

    /// Stream name referenced by `source`, if any.
    ///
    /// Either the source is itself a known name, or an `rtsp://host/<name>`
    /// URL pointing back at a known stream.
    fn reference(&self, source: &str) -> Option<String> {
        if self.knows(source) {
            return Some(source.to_string());
        }

        let name = rtsp_path(source)?;
        self.knows(name).then(|| name.to_string())
    }
}

/// Stream name addressed by an `rtsp://host/<name>` URL
fn rtsp_path(source: &str) -> Option<&str> {
    let rest = source
        .strip_prefix("rtsp://")
        .or_else(|| source.strip_prefix("rtsps://"))?;
    let (_, path) = rest.split_once('/')?;
    let name = path.split(['?', '#']).next().unwrap_or_default();
    (!name.is_empty()).then_some(name)
}

/// Central registry for all streams
///
/// Thread-safe via `RwLock`. Lookups of built streams only take the read
/// lock; construction happens under the write lock, so concurrent first
/// access to a name builds exactly one stream.
pub struct StreamRegistry {
    handlers: Arc<Handlers>,
    config: RegistryConfig,
    tables: RwLock<Tables>,
}

impl StreamRegistry {
    /// Create a registry with default configuration
    pub fn new(handlers: Handlers) -> Self {
        Self::with_config(handlers, RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(handlers: Handlers, config: RegistryConfig) -> Self {
        Self {
            handlers: Arc::new(handlers),
            config,
            tables: RwLock::new(Tables::default()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn handlers(&self) -> &Arc<Handlers> {
        &self.handlers
    }

    /// Record configured streams.
    ///
    /// Sources with an unknown scheme or a malformed URL are logged, left out
    /// and returned; the rest of the configuration still loads. A name that
    /// already has a running stream keeps it and swaps its sources in place;
    /// a stream replaced by an alias is stopped once no name points at it.
    pub async fn load(&self, config: &StreamsConfig) -> Vec<Error> {
        let mut errors = Vec::new();
        let mut resourced: Vec<(Arc<Stream>, Vec<SourceSpec>)> = Vec::new();
        let mut replaced: Vec<Arc<Stream>> = Vec::new();

        let mut tables = self.tables.write().await;
        for (name, sources) in &config.streams {
            let mut valid = Vec::new();
            let mut references = 0;
            for spec in sources.specs() {
                // References may point at streams later in the same config
                let is_reference = config.streams.contains_key(spec.url())
                    || tables.reference(spec.url()).is_some()
                    || rtsp_path(spec.url()).is_some_and(|p| config.streams.contains_key(p));

                if is_reference {
                    references += 1;
                    valid.push(spec.clone());
                    continue;
                }

                match self.handlers.validate(spec.url()) {
                    Ok(()) => valid.push(spec.clone()),
                    Err(e) => {
                        tracing::warn!(stream = %name, source = %spec.url(), error = %e, "Invalid stream source");
                        errors.push(Error::Config(e));
                    }
                }
            }

            if valid.is_empty() && !sources.specs().is_empty() {
                continue;
            }

            tables.persistent.insert(name.clone());
            let alias = valid.len() == 1 && references == 1;

            match tables.streams.get(name) {
                // Own stream with real sources: keep consumers, swap sources
                Some(stream) if stream.name() == name && !alias => {
                    resourced.push((Arc::clone(stream), valid));
                }
                _ => {
                    if let Some(stream) = tables.streams.remove(name) {
                        replaced.push(stream);
                    }
                    tables.pending.insert(name.clone(), valid);
                }
            }
        }

        // Streams still reachable through another name keep running
        replaced.retain(|stream| !tables.streams.values().any(|s| Arc::ptr_eq(s, stream)));
        drop(tables);

        for (stream, sources) in resourced {
            tracing::debug!(stream = %stream.name(), sources = sources.len(), "Stream reloaded in place");
            stream.set_sources(&sources).await;
        }

        let mut stopped: Vec<Arc<Stream>> = Vec::new();
        for stream in replaced {
            if stopped.iter().any(|s| Arc::ptr_eq(s, &stream)) {
                continue;
            }
            tracing::info!(stream = %stream.name(), "Replaced stream stopped");
            stream.stop().await;
            stopped.push(stream);
        }

        tracing::info!(streams = config.streams.len(), errors = errors.len(), "Streams configuration loaded");
        errors
    }

    /// Look up a stream, building it from configuration on first access
    pub async fn get(&self, name: &str) -> Result<Arc<Stream>> {
        {
            let tables = self.tables.read().await;
            if let Some(stream) = tables.streams.get(name) {
                return Ok(Arc::clone(stream));
            }
            if !tables.pending.contains_key(name) {
                return Err(RegistryError::StreamNotFound(name.to_string()).into());
            }
        }

        let mut tables = self.tables.write().await;
        self.resolve(&mut tables, name, &mut Vec::new())
    }

    /// Create (or re-source) a stream from explicit sources
    pub async fn create(&self, name: &str, sources: &[SourceSpec]) -> Result<Arc<Stream>> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName.into());
        }
        for spec in sources {
            self.handlers.validate(spec.url())?;
        }

        let existing = {
            let mut tables = self.tables.write().await;
            tables.persistent.insert(name.to_string());
            tables.pending.remove(name);

            match tables.streams.get(name) {
                Some(stream) => Arc::clone(stream),
                None => {
                    let stream = self.build(name, sources);
                    tables.streams.insert(name.to_string(), Arc::clone(&stream));
                    tracing::info!(stream = %name, sources = sources.len(), "Stream created");
                    return Ok(stream);
                }
            }
        };

        existing.set_sources(sources).await;
        Ok(existing)
    }

    /// Point `name` at `source`.
    ///
    /// If `source` references another stream, `name` becomes its alias. If
    /// `name` already exists, `source` is substituted into its `{input}`
    /// templates. Otherwise a new ad-hoc stream is created.
    pub async fn patch(&self, name: &str, source: &str) -> Result<Arc<Stream>> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName.into());
        }

        let existing = {
            let mut tables = self.tables.write().await;

            if let Some(target) = tables.reference(source) {
                let stream = self.resolve(&mut tables, &target, &mut Vec::new())?;
                if name != target {
                    tables.pending.remove(name);
                    tables.streams.insert(name.to_string(), Arc::clone(&stream));
                    tracing::info!(stream = %name, target = %target, "Stream alias");
                }
                return Ok(stream);
            }

            self.handlers.validate(source)?;

            if tables.knows(name) {
                self.resolve(&mut tables, name, &mut Vec::new())?
            } else {
                let stream = self.build(name, &[SourceSpec::from(source)]);
                tables.streams.insert(name.to_string(), Arc::clone(&stream));
                tracing::info!(stream = %name, source = %source, "Ad-hoc stream created");
                return Ok(stream);
            }
        };

        existing.patch_source(source).await;
        Ok(existing)
    }

    /// Resolve a `src=...&name=...` request.
    ///
    /// `src` may be a stream name or a source URL; without `name` the source
    /// itself becomes the stream name.
    pub async fn get_or_patch(&self, query: &str) -> Result<Arc<Stream>> {
        let mut source = None;
        let mut name = None;
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "src" if source.is_none() => source = Some(value.into_owned()),
                "name" if name.is_none() => name = Some(value.into_owned()),
                _ => {}
            }
        }

        let source = source
            .filter(|s| !s.is_empty())
            .ok_or(RegistryError::MissingSource)?;

        match self.get(&source).await {
            Ok(stream) => return Ok(stream),
            Err(Error::Registry(RegistryError::StreamNotFound(_))) => {}
            Err(e) => return Err(e),
        }

        match name.filter(|n| !n.is_empty()) {
            Some(name) => self.patch(&name, &source).await,
            None => self.patch(&source, &source).await,
        }
    }

    /// Remove a name; the stream is stopped unless another alias still
    /// points at it. Returns whether the name existed.
    pub async fn delete(&self, name: &str) -> bool {
        let removed = {
            let mut tables = self.tables.write().await;
            let was_pending = tables.pending.remove(name).is_some();
            tables.persistent.remove(name);

            match tables.streams.remove(name) {
                Some(stream) => {
                    let aliased = tables.streams.values().any(|s| Arc::ptr_eq(s, &stream));
                    Some((stream, aliased))
                }
                None => {
                    if was_pending {
                        tracing::info!(stream = %name, "Stream deleted");
                    }
                    return was_pending;
                }
            }
        };

        if let Some((stream, aliased)) = removed {
            if !aliased {
                stream.stop().await;
            }
            tracing::info!(stream = %name, still_aliased = aliased, "Stream deleted");
        }
        true
    }

    /// Snapshot of every stream, sorted by name
    pub async fn all(&self) -> Vec<StreamInfo> {
        let (built, pending) = {
            let tables = self.tables.read().await;
            let built: Vec<(String, Arc<Stream>)> = tables
                .streams
                .iter()
                .map(|(name, stream)| (name.clone(), Arc::clone(stream)))
                .collect();
            let pending: Vec<(String, Vec<SourceSpec>)> = tables
                .pending
                .iter()
                .map(|(name, specs)| (name.clone(), specs.clone()))
                .collect();
            (built, pending)
        };

        let mut infos = Vec::with_capacity(built.len() + pending.len());
        for (name, stream) in built {
            let mut info = stream.info().await;
            info.name = name;
            infos.push(info);
        }
        for (name, specs) in pending {
            infos.push(StreamInfo {
                name,
                producers: specs.iter().map(idle_producer).collect(),
                consumers: Vec::new(),
            });
        }

        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Number of known stream names (built or configured)
    pub async fn stream_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.streams.len() + tables.pending.len()
    }

    /// Run cleanup once
    ///
    /// Removes ad-hoc streams that have had no consumers for longer than
    /// `idle_stream_timeout`. Configured streams persist.
    pub async fn cleanup(&self) {
        let removed: Vec<(String, Arc<Stream>)> = {
            let mut tables = self.tables.write().await;
            let timeout = self.config.idle_stream_timeout;

            let names: Vec<String> = tables
                .streams
                .iter()
                .filter(|(name, stream)| {
                    !tables.persistent.contains(*name)
                        && stream.idle_for().is_some_and(|idle| idle > timeout)
                })
                .map(|(name, _)| name.clone())
                .collect();

            names
                .into_iter()
                .filter_map(|name| tables.streams.remove(&name).map(|s| (name, s)))
                .collect()
        };

        for (name, stream) in &removed {
            // Aliases of one stream are removed together; stop it once
            let first = removed.iter().find(|(_, s)| Arc::ptr_eq(s, stream)).map(|(n, _)| n);
            if first == Some(name) {
                stream.stop().await;
            }
            tracing::info!(stream = %name, "Stream removed by cleanup");
        }
    }

    /// Spawn background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.cleanup().await;
            }
        })
    }

    /// Stop every stream and forget all names
    pub async fn shutdown(&self) {
        let streams: Vec<Arc<Stream>> = {
            let mut tables = self.tables.write().await;
            tables.pending.clear();
            tables.persistent.clear();
            tables.streams.drain().map(|(_, stream)| stream).collect()
        };

        let mut stopped: Vec<Arc<Stream>> = Vec::new();
        for stream in streams {
            if stopped.iter().any(|s| Arc::ptr_eq(s, &stream)) {
                continue;
            }
            stream.stop().await;
            stopped.push(stream);
        }

        tracing::info!(streams = stopped.len(), "Registry shut down");
    }

    fn build(&self, name: &str, sources: &[SourceSpec]) -> Arc<Stream> {
        Stream::new(name, sources, Arc::clone(&self.handlers), self.config.clone())
    }

    /// Build `name` (or follow its alias chain). Caller holds the write lock.
    fn resolve(&self, tables: &mut Tables, name: &str, visited: &mut Vec<String>) -> Result<Arc<Stream>> {
        if let Some(stream) = tables.streams.get(name) {
            return Ok(Arc::clone(stream));
        }

        if visited.iter().any(|v| v == name) {
            visited.push(name.to_string());
            let chain = visited.join(" -> ");
            tracing::warn!(chain = %chain, "Stream reference loop");
            return Err(RegistryError::Recursion(chain).into());
        }
        visited.push(name.to_string());

        let specs = tables
            .pending
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::StreamNotFound(name.to_string()))?;

        let target = match specs.as_slice() {
            [only] => tables.reference(only.url()),
            _ => None,
        };

        let stream = match target {
            Some(target) => {
                let stream = self.resolve(tables, &target, visited)?;
                tracing::debug!(stream = %name, target = %target, "Stream alias resolved");
                stream
            }
            None => {
                tracing::debug!(stream = %name, sources = specs.len(), "Stream built from configuration");
                self.build(name, &specs)
            }
        };

        tables.pending.remove(name);
        tables.streams.insert(name.to_string(), Arc::clone(&stream));
        Ok(stream)
    }
}

fn idle_producer(spec: &SourceSpec) -> ProducerInfo {
    ProducerInfo {
        url: spec.url().to_string(),
        state: ProducerState::Idle,
        format: None,
        medias: Vec::new(),
        receivers: 0,
        recv: CounterSnapshot::default(),
        bitrate: 0,
        tracks: CounterSnapshot::default(),
        always_on: spec.always_on(),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::consumer::{Consumer, ConsumerState, PacketSink};
    use crate::error::ConfigError;
    use crate::media::codec::CODEC_H264;
    use crate::media::{Codec, Direction, Kind, Media};
    use crate::producer::Producer;
    use crate::track::Track;

    fn handlers() -> Handlers {
        let refuse = |_url: String| async move { Err::<Arc<dyn Producer>, _>(Error::Unsupported("test")) };
        Handlers::new()
            .producer("rtsp", refuse)
            .producer("ffmpeg", refuse)
            .producer("exec", refuse)
    }

    /// Live video source that records whether it was stopped
    struct Feed {
        url: String,
        done: CancellationToken,
        stopped: AtomicBool,
    }

    impl Feed {
        fn is_stopped(&self) -> bool {
            self.stopped.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Producer for Feed {
        fn format_name(&self) -> &str {
            "feed"
        }

        fn medias(&self) -> Vec<Media> {
            vec![Media::new(Kind::Video, Direction::Recvonly, vec![Codec::new(CODEC_H264)])]
        }

        async fn track(&self, media: &Media, codec: &Codec) -> Result<Arc<Track>> {
            Ok(Track::new(media, codec.clone()))
        }

        async fn start(&self) -> Result<()> {
            self.done.cancelled().await;
            Ok(())
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

    type Feeds = Arc<parking_lot::Mutex<Vec<Arc<Feed>>>>;

    fn feed_registry() -> (StreamRegistry, Feeds) {
        let feeds: Feeds = Arc::default();
        let opened = Arc::clone(&feeds);
        let handlers = handlers().producer("feed", move |url: String| {
            let feed = Arc::new(Feed {
                url,
                done: CancellationToken::new(),
                stopped: AtomicBool::new(false),
            });
            opened.lock().push(Arc::clone(&feed));
            async move { Ok::<_, Error>(feed as Arc<dyn Producer>) }
        });
        (StreamRegistry::new(handlers), feeds)
    }

    fn registry() -> StreamRegistry {
        StreamRegistry::new(handlers())
    }

    #[test]
    fn test_rtsp_path() {
        assert_eq!(rtsp_path("rtsp://localhost:8554/cam?video"), Some("cam"));
        assert_eq!(rtsp_path("rtsps://host/cam#x"), Some("cam"));
        assert_eq!(rtsp_path("rtsp://host/"), None);
        assert_eq!(rtsp_path("tcp://host:9000/cam"), None);
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let registry = registry();
        let result = registry.get("nope").await;
        assert!(matches!(
            result,
            Err(Error::Registry(RegistryError::StreamNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_load_and_lazy_get() {
        let registry = registry();
        let config = StreamsConfig::new()
            .stream("camera1", ["rtsp://10.0.0.10/live"])
            .stream("broken", ["webrtc://x", "exec:cat"]);

        let errors = registry.load(&config).await;
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::Config(ConfigError::UnknownScheme(_))));

        let first = registry.get("camera1").await.unwrap();
        let second = registry.get("camera1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.sources().await, vec!["rtsp://10.0.0.10/live"]);

        let broken = registry.get("broken").await.unwrap();
        assert_eq!(broken.sources().await, vec!["exec:cat"]);
    }

    #[tokio::test]
    async fn test_concurrent_get_builds_once() {
        let registry = Arc::new(registry());
        registry
            .load(&StreamsConfig::new().stream("cam", ["rtsp://10.0.0.10/live"]))
            .await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move { registry.get("cam").await.unwrap() }));
        }

        let mut streams = Vec::new();
        for handle in handles {
            streams.push(handle.await.unwrap());
        }
        assert!(streams.iter().all(|s| Arc::ptr_eq(s, &streams[0])));
    }

    #[tokio::test]
    async fn test_recursion_is_error() {
        let registry = registry();
        let config = StreamsConfig::new()
            .stream("a", ["rtsp://localhost:8554/b"])
            .stream("b", ["rtsp://localhost:8554/a"]);
        assert!(registry.load(&config).await.is_empty());

        let result = registry.get_or_patch("src=a").await;
        match result {
            Err(Error::Registry(RegistryError::Recursion(chain))) => {
                assert_eq!(chain, "a -> b -> a");
            }
            other => panic!("expected recursion error, got {:?}", other.map(|s| s.name().to_string())),
        }
    }

    #[tokio::test]
    async fn test_self_reference_is_error() {
        let registry = registry();
        registry.load(&StreamsConfig::new().stream("loop", ["loop"])).await;

        let result = registry.get("loop").await;
        assert!(matches!(
            result,
            Err(Error::Registry(RegistryError::Recursion(_)))
        ));
    }

    #[tokio::test]
    async fn test_rtsp_alias() {
        let registry = registry();
        let stream1 = registry
            .create("from_yaml", &[SourceSpec::from("exec:does_not_matter")])
            .await
            .unwrap();

        let stream2 = registry
            .get_or_patch("src=rtsp://localhost:8554/from_yaml?video")
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&stream1, &stream2));
        assert_eq!(stream1.sources().await, stream2.sources().await);
        assert_eq!(registry.stream_count().await, 2);
    }

    #[tokio::test]
    async fn test_patch_template() {
        let registry = registry();
        let stream1 = registry
            .create("camera.from_hass", &[SourceSpec::from("ffmpeg:{input}#video=copy")])
            .await
            .unwrap();

        let stream2 = registry
            .patch("camera.from_hass", "rtsp://example.com")
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&stream1, &stream2));
        assert_eq!(
            stream1.sources().await,
            vec!["ffmpeg:rtsp://example.com#video=copy"]
        );
    }

    #[tokio::test]
    async fn test_get_or_patch() {
        let registry = registry();

        let missing = registry.get_or_patch("name=x").await;
        assert!(matches!(
            missing,
            Err(Error::Registry(RegistryError::MissingSource))
        ));

        let adhoc = registry.get_or_patch("src=rtsp://10.0.0.5/live").await.unwrap();
        assert_eq!(adhoc.name(), "rtsp://10.0.0.5/live");

        let named = registry
            .get_or_patch("src=rtsp://10.0.0.6/live&name=door")
            .await
            .unwrap();
        assert_eq!(named.name(), "door");

        let again = registry.get_or_patch("src=door").await.unwrap();
        assert!(Arc::ptr_eq(&named, &again));

        let unknown = registry.get_or_patch("src=webrtc://x").await;
        assert!(matches!(unknown, Err(Error::Config(ConfigError::UnknownScheme(_)))));
    }

    #[tokio::test]
    async fn test_delete_keeps_aliased_stream() {
        let registry = registry();
        let stream = registry
            .create("cam", &[SourceSpec::from("rtsp://10.0.0.10/live")])
            .await
            .unwrap();
        registry.patch("alias", "cam").await.unwrap();

        assert!(registry.delete("cam").await);
        let alias = registry.get("alias").await.unwrap();
        assert!(Arc::ptr_eq(&stream, &alias));

        assert!(registry.delete("alias").await);
        assert!(!registry.delete("alias").await);
        assert_eq!(registry.stream_count().await, 0);
    }

    #[tokio::test]
    async fn test_all_sorted() {
        let registry = registry();
        registry
            .load(&StreamsConfig::new().stream("zeta", ["rtsp://z/live"]).stream("alpha", ["rtsp://a/live"]))
            .await;
        registry.patch("mid", "rtsp://m/live").await.unwrap();

        let names: Vec<String> = registry.all().await.into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);

        let json = serde_json::to_value(registry.all().await).unwrap();
        assert_eq!(json[0]["producers"][0]["state"], "idle");
    }

    #[tokio::test]
    async fn test_cleanup_removes_idle_adhoc_only() {
        let config = RegistryConfig::default().idle_stream_timeout(Duration::from_millis(10));
        let registry = StreamRegistry::with_config(handlers(), config);

        registry.create("configured", &[SourceSpec::from("rtsp://c/live")]).await.unwrap();
        registry.patch("adhoc", "rtsp://a/live").await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        registry.cleanup().await;

        assert!(registry.get("configured").await.is_ok());
        assert!(registry.get("adhoc").await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown() {
        let registry = registry();
        registry.patch("a", "rtsp://a/live").await.unwrap();
        registry.patch("b", "a").await.unwrap();

        registry.shutdown().await;
        assert_eq!(registry.stream_count().await, 0);
    }

    #[tokio::test]
    async fn test_reload_swaps_sources_in_place() {
        let (registry, feeds) = feed_registry();
        registry.load(&StreamsConfig::new().stream("cam", ["feed://a"])).await;

        let stream = registry.get("cam").await.unwrap();
        let sink = Arc::new(PacketSink::from_query("video"));
        stream.add_consumer(sink.clone()).await.unwrap();
        assert_eq!(feeds.lock().len(), 1);

        let errors = registry.load(&StreamsConfig::new().stream("cam", ["feed://b"])).await;
        assert!(errors.is_empty());

        let reloaded = registry.get("cam").await.unwrap();
        assert!(Arc::ptr_eq(&stream, &reloaded));
        assert_eq!(reloaded.sources().await, vec!["feed://b"]);
        assert_eq!(reloaded.consumer_count().await, 1);

        let (old, new) = {
            let feeds = feeds.lock();
            assert_eq!(feeds.len(), 2);
            (Arc::clone(&feeds[0]), Arc::clone(&feeds[1]))
        };
        assert_eq!(old.url, "feed://a");
        assert!(old.is_stopped());
        assert_eq!(new.url, "feed://b");
        assert!(!new.is_stopped());

        registry.shutdown().await;
        assert!(new.is_stopped());
        assert_eq!(sink.state(), ConsumerState::Closed);
    }

    #[tokio::test]
    async fn test_reload_as_alias_stops_old_stream() {
        let (registry, feeds) = feed_registry();
        registry
            .load(&StreamsConfig::new().stream("cam", ["feed://a"]).stream("door", ["feed://d"]))
            .await;

        let stream = registry.get("cam").await.unwrap();
        let sink = Arc::new(PacketSink::from_query("video"));
        stream.add_consumer(sink.clone()).await.unwrap();

        registry
            .load(&StreamsConfig::new().stream("cam", ["door"]))
            .await;

        assert!(feeds.lock()[0].is_stopped());
        assert_eq!(sink.state(), ConsumerState::Closed);
        assert_eq!(stream.consumer_count().await, 0);

        let alias = registry.get("cam").await.unwrap();
        assert_eq!(alias.name(), "door");
        assert!(Arc::ptr_eq(&alias, &registry.get("door").await.unwrap()));
    }
}
