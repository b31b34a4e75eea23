//! Scheme to factory tables
//!
//! Built once at startup, then shared read-only as `Arc<Handlers>` by the
//! registry and every producer binding.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::consumer::{Consumer, ConsumerFactory, ConsumerRequest};
use crate::error::{ConfigError, Result};
use crate::producer::{Producer, ProducerFactory};

/// Scheme of a source URL: the text before the first `:`
pub fn scheme(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once(':')?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Producer and consumer factories keyed by scheme
#[derive(Default, Clone)]
pub struct Handlers {
    producers: HashMap<String, Arc<dyn ProducerFactory>>,
    consumers: HashMap<String, Arc<dyn ConsumerFactory>>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a producer factory for `scheme`
    pub fn producer<F>(mut self, scheme: &str, factory: F) -> Self
    where
        F: ProducerFactory + 'static,
    {
        self.producers.insert(scheme.to_string(), Arc::new(factory));
        self
    }

    /// Register a consumer factory for `scheme`
    pub fn consumer<F>(mut self, scheme: &str, factory: F) -> Self
    where
        F: ConsumerFactory + 'static,
    {
        self.consumers.insert(scheme.to_string(), Arc::new(factory));
        self
    }

    pub fn has_producer(&self, scheme: &str) -> bool {
        self.producers.contains_key(scheme)
    }

    /// Check that `url` names a registered producer scheme
    pub fn validate(&self, url: &str) -> std::result::Result<(), ConfigError> {
        let scheme = scheme(url).ok_or_else(|| ConfigError::MalformedUrl(url.to_string()))?;
        if !self.has_producer(scheme) {
            return Err(ConfigError::UnknownScheme(scheme.to_string()));
        }
        Ok(())
    }

    /// Open a producer for `url` with the factory of its scheme
    pub async fn open_producer(&self, url: &str) -> Result<Arc<dyn Producer>> {
        self.validate(url)?;
        let factory = scheme(url)
            .and_then(|s| self.producers.get(s))
            .ok_or_else(|| ConfigError::MalformedUrl(url.to_string()))?;
        factory.open(url).await
    }

    /// Open a consumer with the factory registered for `scheme`
    pub async fn open_consumer(
        &self,
        scheme: &str,
        request: ConsumerRequest,
    ) -> Result<Arc<dyn Consumer>> {
        let factory = self
            .consumers
            .get(scheme)
            .ok_or_else(|| ConfigError::UnknownScheme(scheme.to_string()))?;
        factory.open(request).await
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut producers: Vec<_> = self.producers.keys().collect();
        let mut consumers: Vec<_> = self.consumers.keys().collect();
        producers.sort();
        consumers.sort();
        f.debug_struct("Handlers")
            .field("producers", &producers)
            .field("consumers", &consumers)
            .finish()
    }
}
