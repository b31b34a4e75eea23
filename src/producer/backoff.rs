//! Reconnection backoff

use std::time::Duration;

/// How a producer binding retries after its connection drops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after the first failed attempt
    pub initial: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Growth factor between attempts
    pub multiplier: u32,

    /// Give up after this many failed attempts (None = never)
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2,
            max_attempts: Some(20),
        }
    }
}

impl ReconnectPolicy {
    /// Set the first delay
    pub fn initial(mut self, delay: Duration) -> Self {
        self.initial = delay;
        self
    }

    /// Cap every delay
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the maximum number of failed attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Retry forever
    pub fn unlimited(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Delay to wait after `failures` consecutive failed attempts (1-based)
    pub fn delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1);
        let factor = self.multiplier.max(1).checked_pow(exp).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether `failures` failed attempts use up the budget
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures >= max)
    }
}
