//! Notification events: types and the ordered channel.
//!
//! This module groups the event **data model** and the **bus** the allocator
//! and drivers publish onto.
//!
//! ## Contents
//! - [`EventKind`], [`Payload`], [`LogLevel`], [`Event`] the notification contract
//! - [`Bus`], [`EventStream`] unbounded, sequenced mpsc channel
//!
//! ## Quick reference
//! - **Publishers**: `Allocator` (every committed decision, under its lock),
//!   driver tasks (`STATUS` transitions).
//! - **Consumer**: `Simulation` listener, which forwards each event to the
//!   `SubscriberSet` (or a caller holding the `EventStream` directly).

mod bus;
mod event;

pub use bus::{Bus, EventStream};
pub use event::{Event, EventKind, LogLevel, Payload};
