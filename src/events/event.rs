//! # Notification events pushed by the allocator and the drivers.
//!
//! The [`EventKind`] enum mirrors the notification contract:
//!
//! | kind             | payload                  | subject        |
//! |------------------|--------------------------|----------------|
//! | `Global`         | available vector         | -              |
//! | `Log`            | level + narrative text   | -              |
//! | `HospitalInit`   | `{max, allocated}`       | consumer name  |
//! | `HospitalUpdate` | allocated vector         | consumer name  |
//! | `Status`         | short status string      | consumer name  |
//!
//! ## Ordering guarantees
//! Each event gets a per-bus sequence number (`seq`) when it is published.
//! Sequence order equals channel order equals commit order for allocator
//! events, because the allocator publishes while holding its lock.
//!
//! ## Example
//! ```rust
//! use safevax::{Event, EventKind, Payload, ResourceVector};
//!
//! let ev = Event::hospital_update("Hospital-1", ResourceVector::new(4, 2, 0));
//! assert_eq!(ev.kind, EventKind::HospitalUpdate);
//! assert_eq!(ev.subject.as_deref(), Some("Hospital-1"));
//! assert_eq!(ev.payload, Payload::Allocated(ResourceVector::new(4, 2, 0)));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::resources::ResourceVector;

/// Classification of notification events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Pool snapshot after a mutation.
    ///
    /// Sets:
    /// - `payload`: [`Payload::Available`]
    Global,

    /// Narrative trace of a decision.
    ///
    /// Sets:
    /// - `payload`: [`Payload::Log`]
    Log,

    /// Registration complete, or max demand changed by a surge.
    ///
    /// Sets:
    /// - `subject`: consumer name
    /// - `payload`: [`Payload::Init`]
    HospitalInit,

    /// Holdings changed.
    ///
    /// Sets:
    /// - `subject`: consumer name
    /// - `payload`: [`Payload::Allocated`]
    HospitalUpdate,

    /// Driver state transition.
    ///
    /// Sets:
    /// - `subject`: consumer name
    /// - `payload`: [`Payload::Status`]
    Status,
}

impl EventKind {
    /// Wire-style tag (`GLOBAL`, `LOG`, ...).
    pub fn as_tag(&self) -> &'static str {
        match self {
            EventKind::Global => "GLOBAL",
            EventKind::Log => "LOG",
            EventKind::HospitalInit => "HOSPITAL_INIT",
            EventKind::HospitalUpdate => "HOSPITAL_UPDATE",
            EventKind::Status => "STATUS",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Severity of a [`EventKind::Log`] line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Normal decision (registration, grant, release).
    Info,
    /// Caller has to wait or retry (stock unavailable, unsafe denial, admin shock).
    Warn,
    /// Grant issued with the safety check disabled.
    Risk,
}

/// Event body; the variant always matches the event's [`EventKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Available pool.
    Available(ResourceVector),
    /// Narrative line.
    Log {
        /// Severity.
        level: LogLevel,
        /// Human-readable text.
        text: Arc<str>,
    },
    /// Registration record.
    Init {
        /// Declared maximum demand.
        max: ResourceVector,
        /// Holdings at the time of the event.
        allocated: ResourceVector,
    },
    /// Current holdings.
    Allocated(ResourceVector),
    /// Short status string.
    Status(Arc<str>),
}

/// Notification record: `{kind, payload, subject?}` plus ordering metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Per-bus sequence number, assigned by [`Bus::publish`](crate::events::Bus::publish).
    pub seq: u64,
    /// Wall-clock timestamp (for logs).
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Event body.
    pub payload: Payload,
    /// Consumer the event is about, if any.
    pub subject: Option<Arc<str>>,
}

impl Event {
    fn new(kind: EventKind, payload: Payload) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
            payload,
            subject: None,
        }
    }

    #[inline]
    fn with_subject(mut self, subject: impl Into<Arc<str>>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// `GLOBAL` event carrying the available pool.
    pub fn global(available: ResourceVector) -> Self {
        Self::new(EventKind::Global, Payload::Available(available))
    }

    /// `LOG` event.
    pub fn log(level: LogLevel, text: impl Into<Arc<str>>) -> Self {
        Self::new(
            EventKind::Log,
            Payload::Log {
                level,
                text: text.into(),
            },
        )
    }

    /// `HOSPITAL_INIT` event.
    pub fn hospital_init(
        name: impl Into<Arc<str>>,
        max: ResourceVector,
        allocated: ResourceVector,
    ) -> Self {
        Self::new(EventKind::HospitalInit, Payload::Init { max, allocated }).with_subject(name)
    }

    /// `HOSPITAL_UPDATE` event.
    pub fn hospital_update(name: impl Into<Arc<str>>, allocated: ResourceVector) -> Self {
        Self::new(EventKind::HospitalUpdate, Payload::Allocated(allocated)).with_subject(name)
    }

    /// `STATUS` event.
    pub fn status(name: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Self {
        Self::new(EventKind::Status, Payload::Status(text.into())).with_subject(name)
    }

    /// Log level, for `LOG` events.
    #[inline]
    pub fn log_level(&self) -> Option<LogLevel> {
        match &self.payload {
            Payload::Log { level, .. } => Some(*level),
            _ => None,
        }
    }

    /// Text of a `LOG` or `STATUS` event.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Log { text, .. } | Payload::Status(text) => Some(&**text),
            _ => None,
        }
    }

    /// True for a grant issued with the safety check disabled.
    #[inline]
    pub fn is_risky(&self) -> bool {
        self.log_level() == Some(LogLevel::Risk)
    }
}
