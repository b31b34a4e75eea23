//! Per-receiver fan-out slots
//!
//! Every receiver bound to a track owns one bounded queue. The track only
//! ever `try_send`s into it, so a receiver that stops draining loses packets
//! instead of stalling the producer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::stats::{CounterSnapshot, Counters};

use super::packet::Packet;
use super::track::Track;

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

/// Outcome of offering a packet to one receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delivery {
    Queued,
    Dropped,
    Closed,
}

/// Shared between the track's receiver list and the [`Binding`] handle
#[derive(Debug)]
pub(super) struct Slot {
    pub(super) id: u64,
    tx: Mutex<Option<mpsc::Sender<Packet>>>,
    /// Track currently holding this slot; changes when the track is replaced
    home: Mutex<Weak<Track>>,
    counters: Counters,
}

impl Slot {
    pub(super) fn new(home: &Arc<Track>, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Packet>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let slot = Arc::new(Self {
            id: NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed),
            tx: Mutex::new(Some(tx)),
            home: Mutex::new(Arc::downgrade(home)),
            counters: Counters::new(),
        });
        (slot, rx)
    }

    pub(super) fn deliver(&self, packet: &Packet) -> Delivery {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Delivery::Closed;
        };

        match tx.try_send(packet.clone()) {
            Ok(()) => {
                self.counters.add(packet.len());
                Delivery::Queued
            }
            Err(TrySendError::Full(_)) => {
                self.counters.drop_one();
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    pub(super) fn set_home(&self, track: &Arc<Track>) {
        *self.home.lock() = Arc::downgrade(track);
    }

    /// Drop the sender so the receiving side sees end-of-stream
    pub(super) fn close(&self) {
        self.tx.lock().take();
    }

    pub(super) fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }
}

/// Handle to one receiver bound to a track
///
/// Dropping the handle unbinds the receiver.
#[derive(Debug)]
pub struct Binding {
    slot: Arc<Slot>,
}

impl Binding {
    pub(super) fn new(slot: Arc<Slot>) -> Self {
        Self { slot }
    }

    pub fn id(&self) -> u64 {
        self.slot.id
    }

    /// Track this receiver is currently attached to
    pub fn track(&self) -> Option<Arc<Track>> {
        self.slot.home.lock().upgrade()
    }

    /// Whether packets can still reach this receiver
    pub fn is_bound(&self) -> bool {
        !self.slot.is_closed()
    }

    /// Packets queued for (and dropped from) this receiver
    pub fn stats(&self) -> CounterSnapshot {
        self.slot.counters.snapshot()
    }

    /// Detach from the track and close the receiver's queue
    pub fn unbind(&self) {
        let home = self.slot.home.lock().upgrade();
        if let Some(track) = home {
            track.remove(self.slot.id);
        }
        self.slot.close();
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.unbind();
    }
}
