//! Track implementation
//!
//! The receiver list is an `ArcSwap` snapshot: writers load it without
//! locking, bind/unbind publish a new list. A write therefore never waits on
//! a bind in progress, and never on a receiver.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::media::{Codec, Direction, Kind, Media};
use crate::stats::{CounterSnapshot, Counters};

use super::binding::{Binding, Delivery, Slot};
use super::packet::Packet;

/// Per-receiver queue length for video tracks
pub const VIDEO_QUEUE_CAPACITY: usize = 4096;
/// Per-receiver queue length for audio tracks
pub const AUDIO_QUEUE_CAPACITY: usize = 128;
/// Per-receiver queue length for application/data tracks
pub const APPLICATION_QUEUE_CAPACITY: usize = 64;

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

fn default_capacity(kind: Kind) -> usize {
    match kind {
        Kind::Video => VIDEO_QUEUE_CAPACITY,
        Kind::Audio => AUDIO_QUEUE_CAPACITY,
        Kind::Application => APPLICATION_QUEUE_CAPACITY,
    }
}

/// One negotiated elementary stream with fan-out to its receivers
#[derive(Debug)]
pub struct Track {
    id: u64,
    kind: Kind,
    direction: Direction,
    codec: Codec,
    capacity: usize,
    receivers: ArcSwap<Vec<Arc<Slot>>>,
    writer_claimed: AtomicBool,
    closed: AtomicBool,
    counters: Counters,
}

impl Track {
    /// Create a track carrying `codec` for the given media
    pub fn new(media: &Media, codec: Codec) -> Arc<Self> {
        Self::with_capacity(media, codec, default_capacity(media.kind))
    }

    /// Create a track with a custom per-receiver queue length
    pub fn with_capacity(media: &Media, codec: Codec, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed),
            kind: media.kind,
            direction: media.direction,
            codec,
            capacity,
            receivers: ArcSwap::from_pointee(Vec::new()),
            writer_claimed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            counters: Counters::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Number of currently bound receivers
    pub fn receiver_count(&self) -> usize {
        self.receivers.load().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Packets written into this track
    pub fn stats(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Claim the single writer handle for this track.
    ///
    /// A track has exactly one feed. Claiming a second writer while the first
    /// is alive is a programming error.
    pub fn writer(self: &Arc<Self>) -> Result<TrackWriter> {
        let claimed = self.writer_claimed.swap(true, Ordering::AcqRel);
        debug_assert!(!claimed, "track {} already has a writer", self.id);
        if claimed {
            tracing::error!(track = self.id, codec = %self.codec, "Duplicate track writer");
            return Err(Error::Invariant(format!(
                "track {} already has a writer",
                self.id
            )));
        }

        Ok(TrackWriter {
            track: Arc::clone(self),
        })
    }

    /// Deliver one packet to every bound receiver.
    ///
    /// Returns how many receivers queued the packet. Receivers with a full
    /// queue lose this packet; nobody is waited on.
    pub fn write_packet(&self, packet: Packet) -> usize {
        if self.is_closed() {
            return 0;
        }

        self.counters.add(packet.len());

        let receivers = self.receivers.load();
        let mut queued = 0;
        let mut stale = false;

        for slot in receivers.iter() {
            match slot.deliver(&packet) {
                Delivery::Queued => queued += 1,
                Delivery::Dropped => {
                    tracing::trace!(track = self.id, receiver = slot.id, "Receiver queue full, packet dropped");
                }
                Delivery::Closed => stale = true,
            }
        }

        if stale {
            self.prune();
        }

        queued
    }

    /// Bind a receiver and hand its queue to the caller
    pub fn subscribe(self: &Arc<Self>) -> (Binding, mpsc::Receiver<Packet>) {
        let (slot, rx) = Slot::new(self, self.capacity);

        if self.is_closed() {
            slot.close();
            return (Binding::new(slot), rx);
        }

        self.receivers.rcu(|list| {
            let mut list = Vec::clone(list);
            list.push(Arc::clone(&slot));
            list
        });

        tracing::trace!(track = self.id, receiver = slot.id, "Receiver bound");
        (Binding::new(slot), rx)
    }

    /// Bind a receiver callback.
    ///
    /// The callback runs on its own task and sees packets in write order.
    pub fn bind<F>(self: &Arc<Self>, mut handler: F) -> Binding
    where
        F: FnMut(Packet) + Send + 'static,
    {
        let (binding, mut rx) = self.subscribe();

        tokio::spawn(async move {
            while let Some(packet) = rx.recv().await {
                handler(packet);
            }
        });

        binding
    }

    /// Move every receiver of this track onto `new`.
    ///
    /// Used when a producer reconnects: receivers keep their queues and
    /// handles, and start seeing packets from the new connection.
    pub fn replace(&self, new: &Arc<Track>) {
        let moved = self.receivers.swap(Arc::new(Vec::new()));
        if moved.is_empty() {
            return;
        }

        for slot in moved.iter() {
            slot.set_home(new);
        }

        new.receivers.rcu(|list| {
            let mut list = Vec::clone(list);
            list.extend(moved.iter().cloned());
            list
        });

        tracing::debug!(from = self.id, to = new.id, receivers = moved.len(), "Track receivers moved");
    }

    /// Unbind every receiver and refuse further writes
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);

        let removed = self.receivers.swap(Arc::new(Vec::new()));
        for slot in removed.iter() {
            slot.close();
        }
    }

    pub(super) fn remove(&self, slot_id: u64) {
        self.receivers.rcu(|list| {
            list.iter()
                .filter(|slot| slot.id != slot_id)
                .cloned()
                .collect::<Vec<_>>()
        });
    }

    fn prune(&self) {
        self.receivers.rcu(|list| {
            list.iter()
                .filter(|slot| !slot.is_closed())
                .cloned()
                .collect::<Vec<_>>()
        });
    }
}

/// Exclusive write handle for a track
#[derive(Debug)]
pub struct TrackWriter {
    track: Arc<Track>,
}

impl TrackWriter {
    pub fn track(&self) -> &Arc<Track> {
        &self.track
    }

    /// See [`Track::write_packet`]
    pub fn write(&self, packet: Packet) -> usize {
        self.track.write_packet(packet)
    }
}

impl Drop for TrackWriter {
    fn drop(&mut self) {
        self.track.writer_claimed.store(false, Ordering::Release);
    }
}
