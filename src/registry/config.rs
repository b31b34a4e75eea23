//! Registry and stream configuration

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::producer::ReconnectPolicy;

/// Runtime tuning shared by every stream of a registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Bound on factory open plus capability discovery
    pub dial_timeout: Duration,

    /// Bound on each track setup call (producer track, consumer add_track)
    pub setup_timeout: Duration,

    /// Producer reconnection policy
    pub reconnect: ReconnectPolicy,

    /// Wait this long after a consumer leaves before stopping idle producers
    pub idle_grace: Duration,

    /// How often the cleanup task runs
    pub cleanup_interval: Duration,

    /// Remove ad-hoc streams without consumers after this long
    pub idle_stream_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(3),
            setup_timeout: Duration::from_secs(3),
            reconnect: ReconnectPolicy::default(),
            idle_grace: Duration::ZERO,
            cleanup_interval: Duration::from_secs(30),
            idle_stream_timeout: Duration::from_secs(60),
        }
    }
}

impl RegistryConfig {
    /// Set dial timeout
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set track setup timeout
    pub fn setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    /// Set reconnect policy
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Set idle grace period
    pub fn idle_grace(mut self, grace: Duration) -> Self {
        self.idle_grace = grace;
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set idle stream timeout
    pub fn idle_stream_timeout(mut self, timeout: Duration) -> Self {
        self.idle_stream_timeout = timeout;
        self
    }
}

/// One configured source: a bare URL or a URL with options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        always_on: bool,
    },
}

impl SourceSpec {
    pub fn url(&self) -> &str {
        match self {
            SourceSpec::Url(url) | SourceSpec::Detailed { url, .. } => url,
        }
    }

    pub fn always_on(&self) -> bool {
        matches!(self, SourceSpec::Detailed { always_on: true, .. })
    }
}

impl From<&str> for SourceSpec {
    fn from(url: &str) -> Self {
        SourceSpec::Url(url.to_string())
    }
}

/// A stream's sources: one spec or an ordered list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Sources {
    One(SourceSpec),
    Many(Vec<SourceSpec>),
}

impl Sources {
    /// Specs in configured (priority) order
    pub fn specs(&self) -> &[SourceSpec] {
        match self {
            Sources::One(spec) => std::slice::from_ref(spec),
            Sources::Many(specs) => specs,
        }
    }
}

/// Stream name to sources mapping, as loaded at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StreamsConfig {
    pub streams: BTreeMap<String, Sources>,
}

impl StreamsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream with plain source URLs
    pub fn stream<I, S>(mut self, name: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SourceSpec>,
    {
        let specs = urls.into_iter().map(Into::into).collect();
        self.streams.insert(name.into(), Sources::Many(specs));
        self
    }
}
