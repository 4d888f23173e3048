//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for consuming the notification stream.
//! Each subscriber is driven by a dedicated worker fed by a bounded queue owned
//! by the [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Events arrive in `seq` order, every event exactly once.
//! - A slow subscriber applies backpressure to the fan-out, never to the
//!   allocator: the bus in front of the fan-out is unbounded.
//! - Panics inside `on_event` are caught and logged; the worker keeps going.
//!
//! ## Example
//! ```rust
//! use safevax::{Event, Subscribe};
//!
//! struct RiskCounter(std::sync::atomic::AtomicUsize);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for RiskCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.is_risky() {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "risk-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    ///
    /// `None` uses the set's default (`Config::subscriber_capacity`).
    fn queue_capacity(&self) -> Option<usize> {
        None
    }
}
