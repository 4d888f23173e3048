//! # Event subscribers for the notification stream.
//!
//! The allocator and the drivers publish onto the [`Bus`](crate::events::Bus);
//! the simulation drains it and hands every event to a [`SubscriberSet`].
//!
//! ## Architecture
//! ```text
//! Allocator / HospitalDriver ── publish(Event) ──► Bus (unbounded, seq-ordered)
//!                                                    │
//!                                          Simulation listener
//!                                                    │
//!                                           SubscriberSet::emit
//!                                      ┌─────────────┼─────────────┐
//!                                      ▼             ▼             ▼
//!                                  LogWriter       Board        Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive** subscribers observe and react (logging, metrics, alerts)
//! - **Stateful** subscribers fold events into a view ([`Board`])

mod embedded;
mod set;
mod subscribe;

pub use embedded::{Board, BoardRow, BoardState, LogLine, Tone};
#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
