//! # Event bus from the allocator and drivers to the notification sink.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::mpsc::unbounded_channel`]:
//! many producers (the allocator under its lock, the drivers) and a single
//! consumer ([`EventStream`]).
//!
//! ## Architecture
//! ```text
//! Producers (many):                    Consumer (one):
//!   Allocator ──┐
//!   Driver 1  ──┼──────► Bus ───────► EventStream ──► Simulation listener ──► SubscriberSet
//!   Driver N  ──┘   (unbounded mpsc)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never waits for the consumer.
//! - **Unbounded**: nothing is dropped while the stream is alive.
//! - **Ordered**: `seq` is assigned and the event sent under one small lock,
//!   so channel order and `seq` order agree.
//! - If the stream was dropped, publishing is a no-op.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::event::Event;

/// Sending side of the notification channel.
///
/// Cheap to clone; all clones share the sequence counter.
#[derive(Clone, Debug)]
pub struct Bus {
    inner: Arc<Mutex<Sequencer>>,
}

#[derive(Debug)]
struct Sequencer {
    next_seq: u64,
    tx: mpsc::UnboundedSender<Event>,
}

impl Bus {
    /// Creates a connected bus/stream pair.
    pub fn channel() -> (Bus, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bus = Bus {
            inner: Arc::new(Mutex::new(Sequencer { next_seq: 1, tx })),
        };
        (bus, EventStream { rx })
    }

    /// Stamps the event with the next sequence number and enqueues it.
    ///
    /// Returns the assigned sequence number.
    pub fn publish(&self, mut ev: Event) -> u64 {
        let mut seq = self.inner.lock();
        ev.seq = seq.next_seq;
        seq.next_seq += 1;
        let _ = seq.tx.send(ev);
        seq.next_seq - 1
    }

    /// True once the receiving [`EventStream`] has been dropped.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().tx.is_closed()
    }
}

/// Receiving side of the notification channel.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventStream {
    /// Waits for the next event; `None` once every [`Bus`] clone is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Takes every event queued right now, in order.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        while let Some(ev) = self.try_recv() {
            out.push(ev);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceVector;

    #[test]
    fn test_seq_is_strictly_increasing_in_channel_order() {
        let (bus, mut stream) = Bus::channel();
        let other = bus.clone();
        bus.publish(Event::global(ResourceVector::ZERO));
        other.publish(Event::status("Hospital-1", "Idle"));
        bus.publish(Event::hospital_update("Hospital-1", ResourceVector::ZERO));

        let seqs: Vec<u64> = stream.drain().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_publish_after_stream_dropped_is_noop() {
        let (bus, stream) = Bus::channel();
        drop(stream);
        assert!(bus.is_closed());
        bus.publish(Event::global(ResourceVector::ZERO));
    }

    #[tokio::test]
    async fn test_recv_ends_when_all_buses_dropped() {
        let (bus, mut stream) = Bus::channel();
        bus.publish(Event::global(ResourceVector::new(1, 2, 3)));
        drop(bus);
        assert!(stream.recv().await.is_some());
        assert!(stream.recv().await.is_none());
    }
}
