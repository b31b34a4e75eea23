//! Stream implementation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::consumer::{Consumer, ConsumerInfo};
use crate::error::Result;
use crate::media::Media;
use crate::producer::ProducerBinding;
use crate::registry::{Handlers, RegistryConfig, SourceSpec};

use super::info::StreamInfo;
use super::negotiate::{self, Link};

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

struct ConsumerEntry {
    id: u64,
    consumer: Arc<dyn Consumer>,
    links: Vec<Link>,
}

struct Inner {
    producers: Vec<Arc<ProducerBinding>>,
    consumers: Vec<ConsumerEntry>,
}

/// Named routing unit: ordered producer bindings plus active consumers
pub struct Stream {
    name: String,
    handlers: Arc<Handlers>,
    config: RegistryConfig,
    /// Serializes negotiation, source changes and idle stops. Producer and
    /// consumer I/O happens under this lock only, never under `inner`.
    control: Mutex<()>,
    inner: Mutex<Inner>,
    /// Set while the stream has no consumers
    idle_since: parking_lot::Mutex<Option<Instant>>,
}

impl Stream {
    pub fn new(
        name: impl Into<String>,
        sources: &[SourceSpec],
        handlers: Arc<Handlers>,
        config: RegistryConfig,
    ) -> Arc<Self> {
        let producers = sources
            .iter()
            .map(|spec| ProducerBinding::new(spec.url(), spec.always_on(), Arc::clone(&handlers), &config))
            .collect();

        Arc::new(Self {
            name: name.into(),
            handlers,
            config,
            control: Mutex::new(()),
            inner: Mutex::new(Inner {
                producers,
                consumers: Vec::new(),
            }),
            idle_since: parking_lot::Mutex::new(Some(Instant::now())),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Producer bindings in configured order
    pub async fn producers(&self) -> Vec<Arc<ProducerBinding>> {
        self.inner.lock().await.producers.clone()
    }

    /// Source URLs in configured order
    pub async fn sources(&self) -> Vec<String> {
        self.inner.lock().await.producers.iter().map(|b| b.url()).collect()
    }

    pub async fn consumer_count(&self) -> usize {
        self.inner.lock().await.consumers.len()
    }

    /// How long the stream has had no consumers
    pub fn idle_for(&self) -> Option<Duration> {
        self.idle_since.lock().map(|since| since.elapsed())
    }

    /// Negotiate `consumer` against the producers, dialling them as needed.
    ///
    /// Succeeds if at least one requested media got a track; media that
    /// matched nothing are simply left out. The consumer is removed
    /// automatically once it closes.
    pub async fn add_consumer(self: &Arc<Self>, consumer: Arc<dyn Consumer>) -> Result<u64> {
        let requested = consumer.medias();
        let indexed: Vec<(usize, Media)> = requested.iter().cloned().enumerate().collect();

        let control = self.control.lock().await;
        let producers = self.producers().await;
        let outcome = negotiate::negotiate(&producers, &consumer, &indexed).await;

        if outcome.links.is_empty() {
            let err = negotiate::failure(&requested, &outcome);
            tracing::warn!(stream = %self.name, error = %err, "Consumer negotiation failed");
            stop_idle(&producers).await;
            return Err(err.into());
        }

        for binding in outcome.used() {
            binding.start();
        }
        for binding in &producers {
            if binding.always_on() {
                binding.start();
            }
        }

        let id = NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            stream = %self.name,
            consumer = id,
            format = consumer.format_name(),
            tracks = outcome.links.len(),
            requested = requested.len(),
            "Consumer added"
        );

        self.inner.lock().await.consumers.push(ConsumerEntry {
            id,
            consumer: Arc::clone(&consumer),
            links: outcome.links,
        });
        *self.idle_since.lock() = None;

        // Bindings dialled for nothing in this run
        stop_idle(&producers).await;
        drop(control);

        self.watch(id, consumer);
        Ok(id)
    }

    /// Remove and stop a consumer; idle producers are stopped afterwards.
    ///
    /// Returns false if `id` is not a consumer of this stream.
    pub async fn remove_consumer(self: &Arc<Self>, id: u64) -> bool {
        let (entry, producers, empty) = {
            let mut inner = self.inner.lock().await;
            let Some(pos) = inner.consumers.iter().position(|e| e.id == id) else {
                return false;
            };
            let entry = inner.consumers.remove(pos);
            (entry, inner.producers.clone(), inner.consumers.is_empty())
        };

        if let Err(e) = entry.consumer.stop().await {
            tracing::debug!(stream = %self.name, consumer = id, error = %e, "Consumer stop failed");
        }
        drop(entry.links);

        if empty {
            *self.idle_since.lock() = Some(Instant::now());
        }

        tracing::info!(stream = %self.name, consumer = id, "Consumer removed");

        if self.config.idle_grace.is_zero() {
            self.release_idle(&producers).await;
        } else {
            let grace = self.config.idle_grace;
            let stream = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                stream.release_idle(&producers).await;
            });
        }

        true
    }

    /// Replace the producer list.
    ///
    /// Bindings whose URL is unchanged are kept, taking the new `always_on`
    /// flag. Dropped bindings are stopped, and consumers that lost a media are
    /// re-negotiated for it.
    pub async fn set_sources(&self, sources: &[SourceSpec]) {
        let _control = self.control.lock().await;

        let (producers, old, switched_on, lost) = {
            let mut inner = self.inner.lock().await;

            let mut old = std::mem::take(&mut inner.producers);
            let mut producers = Vec::with_capacity(sources.len());
            let mut switched_on = Vec::new();
            for spec in sources {
                let binding = match old.iter().position(|b| b.url() == spec.url()) {
                    Some(pos) => {
                        let binding = old.remove(pos);
                        if binding.set_always_on(spec.always_on()) && spec.always_on() {
                            switched_on.push(Arc::clone(&binding));
                        }
                        binding
                    }
                    None => ProducerBinding::new(
                        spec.url(),
                        spec.always_on(),
                        Arc::clone(&self.handlers),
                        &self.config,
                    ),
                };
                producers.push(binding);
            }
            inner.producers = producers.clone();

            // Links into dropped bindings, per consumer
            let mut lost = Vec::new();
            for entry in inner.consumers.iter_mut() {
                let indices: Vec<usize> = entry
                    .links
                    .iter()
                    .filter(|l| old.iter().any(|b| b.id() == l.binding.id()))
                    .map(|l| l.media_index)
                    .collect();
                if indices.is_empty() {
                    continue;
                }
                entry.links.retain(|l| !indices.contains(&l.media_index));
                lost.push((entry.id, Arc::clone(&entry.consumer), indices));
            }

            (producers, old, switched_on, lost)
        };

        if !old.is_empty() {
            tracing::info!(stream = %self.name, dropped = old.len(), sources = sources.len(), "Stream sources replaced");
            for binding in &old {
                binding.stop().await;
            }
        }

        for binding in switched_on {
            tracing::debug!(stream = %self.name, url = %binding.url(), "Producer switched to always on");
            binding.start();
        }

        for (id, consumer, indices) in lost {
            let requested: Vec<(usize, Media)> = consumer
                .medias()
                .into_iter()
                .enumerate()
                .filter(|(i, _)| indices.contains(i))
                .collect();

            let outcome = negotiate::negotiate(&producers, &consumer, &requested).await;
            for binding in outcome.used() {
                binding.start();
            }
            tracing::debug!(
                stream = %self.name,
                consumer = id,
                lost = requested.len(),
                relinked = outcome.links.len(),
                "Consumer re-negotiated"
            );

            // A consumer that left meanwhile drops its new links here
            let mut inner = self.inner.lock().await;
            if let Some(entry) = inner.consumers.iter_mut().find(|e| e.id == id) {
                entry.links.extend(outcome.links);
            }
        }

        stop_idle(&producers).await;
    }

    /// Substitute `input` into every binding's `{input}` template.
    ///
    /// Returns whether any source URL changed.
    pub async fn patch_source(&self, input: &str) -> bool {
        let inner = self.inner.lock().await;
        let mut changed = false;
        for binding in &inner.producers {
            changed |= binding.set_source(input);
        }
        changed
    }

    /// Stop every consumer and producer
    pub async fn stop(&self) {
        let _control = self.control.lock().await;
        let (consumers, producers) = {
            let mut inner = self.inner.lock().await;
            (std::mem::take(&mut inner.consumers), inner.producers.clone())
        };

        for entry in consumers {
            if let Err(e) = entry.consumer.stop().await {
                tracing::debug!(stream = %self.name, consumer = entry.id, error = %e, "Consumer stop failed");
            }
        }
        for binding in producers {
            binding.stop().await;
        }

        *self.idle_since.lock() = Some(Instant::now());
        tracing::info!(stream = %self.name, "Stream stopped");
    }

    /// Introspection snapshot
    pub async fn info(&self) -> StreamInfo {
        let inner = self.inner.lock().await;
        StreamInfo {
            name: self.name.clone(),
            producers: inner.producers.iter().map(|b| b.info()).collect(),
            consumers: inner
                .consumers
                .iter()
                .map(|e| ConsumerInfo::new(e.id, e.consumer.as_ref()))
                .collect(),
        }
    }

    /// Stop idle producers, in turn with any running negotiation
    async fn release_idle(&self, producers: &[Arc<ProducerBinding>]) {
        let _control = self.control.lock().await;
        stop_idle(producers).await;
    }

    /// Remove the consumer once it closes on its own
    fn watch(self: &Arc<Self>, id: u64, consumer: Arc<dyn Consumer>) {
        let stream: Weak<Stream> = Arc::downgrade(self);
        tokio::spawn(async move {
            consumer.closed().await;
            if let Some(stream) = stream.upgrade() {
                stream.remove_consumer(id).await;
            }
        });
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").field("name", &self.name).finish()
    }
}

async fn stop_idle(producers: &[Arc<ProducerBinding>]) {
    for binding in producers {
        binding.stop_if_idle().await;
    }
}
