//! # SubscriberSet: ordered fan-out over multiple subscribers
//!
//! [`SubscriberSet`] forwards each [`Event`] to every subscriber's worker.
//!
//! ## What it guarantees
//! - Per-subscriber FIFO: each subscriber sees events in `seq` order.
//! - Nothing is dropped while a worker is alive: `emit` awaits queue space.
//! - Panics inside subscribers are caught and logged (isolation).
//!
//! ## What it does **not** guarantee
//! - No ordering across different subscribers.
//!
//! ## Diagram
//! ```text
//!    emit(Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::Event;

use super::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// Subscribers without their own queue capacity get `default_capacity`.
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, default_capacity: usize) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().unwrap_or(default_capacity).max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        tracing::error!(
                            subscriber = sub.name(),
                            seq = ev.seq,
                            panic = panic_message(&*panic),
                            "subscriber panicked"
                        );
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self { channels, workers }
    }

    /// Forwards one event to all subscribers, waiting for queue space.
    pub async fn emit(&self, event: Event) {
        let ev = Arc::new(event);
        for channel in &self.channels {
            if channel.sender.send(Arc::clone(&ev)).await.is_err() {
                tracing::warn!(
                    subscriber = channel.name,
                    seq = ev.seq,
                    "subscriber worker closed; event dropped"
                );
            }
        }
    }

    /// Closes all queues and waits until every worker has drained its queue.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LogLevel;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u64>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().push(ev.seq);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
        fn queue_capacity(&self) -> Option<usize> {
            Some(1)
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, ev: &Event) {
            if ev.seq % 2 == 0 {
                panic!("even seq");
            }
        }
    }

    fn numbered(seq: u64) -> Event {
        let mut ev = Event::log(LogLevel::Info, "x");
        ev.seq = seq;
        ev
    }

    #[tokio::test]
    async fn test_small_queue_keeps_every_event_in_order() {
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>], 8);
        for seq in 1..=50 {
            set.emit(numbered(seq)).await;
        }
        set.shutdown().await;
        assert_eq!(*rec.0.lock(), (1..=50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_isolated() {
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(
            vec![Arc::new(Panicker) as Arc<dyn Subscribe>, rec.clone() as Arc<dyn Subscribe>],
            4,
        );
        assert_eq!(set.len(), 2);
        for seq in 1..=4 {
            set.emit(numbered(seq)).await;
        }
        set.shutdown().await;
        assert_eq!(rec.0.lock().len(), 4);
    }
}
