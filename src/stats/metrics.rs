//! Byte/packet counters for producers, consumers and track bindings

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Live counters, updated from the data plane without locking
#[derive(Debug)]
pub struct Counters {
    bytes: AtomicU64,
    packets: AtomicU64,
    drops: AtomicU64,
    started_at: Instant,
}

impl Counters {
    pub fn new() -> Self {
        Self {
            bytes: AtomicU64::new(0),
            packets: AtomicU64::new(0),
            drops: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Count one packet of `size` bytes
    pub fn add(&self, size: usize) {
        self.bytes.fetch_add(size as u64, Ordering::Relaxed);
        self.packets.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one packet that was discarded
    pub fn drop_one(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn drops(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            bytes: self.bytes(),
            packets: self.packets(),
            drops: self.drops(),
            duration: self.started_at.elapsed(),
        }
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`Counters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub bytes: u64,
    pub packets: u64,
    pub drops: u64,
    #[serde(skip)]
    pub duration: Duration,
}

impl CounterSnapshot {
    /// Average bitrate in bits per second over the counter's lifetime
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration.as_secs();
        if secs > 0 {
            (self.bytes * 8) / secs
        } else {
            0
        }
    }

    /// Sum two snapshots (e.g. all tracks of one producer)
    pub fn merge(self, other: CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            bytes: self.bytes + other.bytes,
            packets: self.packets + other.packets,
            drops: self.drops + other.drops,
            duration: self.duration.max(other.duration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_new() {
        let counters = Counters::new();
        assert_eq!(counters.bytes(), 0);
        assert_eq!(counters.packets(), 0);
        assert_eq!(counters.drops(), 0);
    }

    #[test]
    fn test_counters_add() {
        let counters = Counters::new();
        counters.add(100);
        counters.add(50);
        counters.drop_one();

        let snap = counters.snapshot();
        assert_eq!(snap.bytes, 150);
        assert_eq!(snap.packets, 2);
        assert_eq!(snap.drops, 1);
    }

    #[test]
    fn test_bitrate() {
        let snap = CounterSnapshot {
            bytes: 1_000_000,
            duration: Duration::from_secs(10),
            ..Default::default()
        };

        // 1,000,000 bytes * 8 bits / 10 seconds
        assert_eq!(snap.bitrate(), 800_000);
    }

    #[test]
    fn test_bitrate_zero_duration() {
        let snap = CounterSnapshot {
            bytes: 1_000_000,
            ..Default::default()
        };

        assert_eq!(snap.bitrate(), 0);
    }

    #[test]
    fn test_merge() {
        let a = CounterSnapshot {
            bytes: 10,
            packets: 1,
            drops: 0,
            duration: Duration::from_secs(1),
        };
        let b = CounterSnapshot {
            bytes: 5,
            packets: 2,
            drops: 3,
            duration: Duration::from_secs(4),
        };

        let sum = a.merge(b);
        assert_eq!(sum.bytes, 15);
        assert_eq!(sum.packets, 3);
        assert_eq!(sum.drops, 3);
        assert_eq!(sum.duration, Duration::from_secs(4));
    }
}
