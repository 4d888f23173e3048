//! Error types used by the allocator, the ledger and the runtime.
//!
//! This module defines three error enums:
//!
//! - [`AllocError`]: per-call failures of allocator operations (register/request/release).
//! - [`LedgerError`]: a bookkeeping invariant found broken by [`Ledger::check_invariants`](crate::Ledger::check_invariants).
//! - [`RuntimeError`]: errors raised by the simulation runtime itself.
//!
//! All of them provide `as_label` for logs. [`AllocError::is_retryable`] separates
//! the recoverable outcomes (stock unavailable, unsafe state) from caller errors.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::resources::{ResourceKind, ResourceVector};

/// # Errors produced by allocator operations.
///
/// Every variant is local to the failing call: the ledger is left exactly as it
/// was before the call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// Requested amount exceeds what is currently available. Retry later.
    #[error("{consumer}: stock unavailable (requested {requested}, available {available})")]
    Unavailable {
        /// Requesting consumer.
        consumer: Arc<str>,
        /// Amount asked for.
        requested: ResourceVector,
        /// Available pool at the time of the request.
        available: ResourceVector,
    },

    /// Granting would leave the pool without a safe completion order. Retry later.
    #[error("{consumer}: request {requested} denied, grant would leave an unsafe state")]
    Unsafe {
        /// Requesting consumer.
        consumer: Arc<str>,
        /// Amount asked for.
        requested: ResourceVector,
    },

    /// The name is already registered.
    #[error("{consumer}: already registered")]
    AlreadyRegistered {
        /// Duplicate name.
        consumer: Arc<str>,
    },

    /// The name was never registered.
    #[error("{consumer}: unknown consumer")]
    UnknownConsumer {
        /// Unknown name.
        consumer: Arc<str>,
    },

    /// The request is larger than the consumer's remaining need.
    #[error("{consumer}: request {requested} exceeds remaining need {need}")]
    ExceedsNeed {
        /// Requesting consumer.
        consumer: Arc<str>,
        /// Amount asked for.
        requested: ResourceVector,
        /// Remaining need at the time of the request.
        need: ResourceVector,
    },

    /// The release is larger than what the consumer holds.
    #[error("{consumer}: release {released} exceeds holdings {held}")]
    ExceedsHeld {
        /// Releasing consumer.
        consumer: Arc<str>,
        /// Amount handed back.
        released: ResourceVector,
        /// Holdings at the time of the release.
        held: ResourceVector,
    },

    /// The request asks for nothing.
    #[error("{consumer}: empty request")]
    EmptyRequest {
        /// Requesting consumer.
        consumer: Arc<str>,
    },

    /// A demand surge must raise every resource kind by at least one.
    #[error("demand surge {delta} is not positive in every kind")]
    NonPositiveSurge {
        /// Rejected delta.
        delta: ResourceVector,
    },

    /// A demand surge would overflow a consumer's max. No account was changed.
    #[error("{consumer}: demand surge {delta} overflows max {max}")]
    SurgeOverflow {
        /// First consumer that cannot absorb the surge.
        consumer: Arc<str>,
        /// Its max before the surge.
        max: ResourceVector,
        /// Rejected delta.
        delta: ResourceVector,
    },
}

impl AllocError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use safevax::{AllocError, ResourceVector};
    ///
    /// let err = AllocError::Unsafe { consumer: "Hospital-1".into(), requested: ResourceVector::new(1, 0, 0) };
    /// assert_eq!(err.as_label(), "alloc_unsafe");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AllocError::Unavailable { .. } => "alloc_unavailable",
            AllocError::Unsafe { .. } => "alloc_unsafe",
            AllocError::AlreadyRegistered { .. } => "alloc_already_registered",
            AllocError::UnknownConsumer { .. } => "alloc_unknown_consumer",
            AllocError::ExceedsNeed { .. } => "alloc_exceeds_need",
            AllocError::ExceedsHeld { .. } => "alloc_exceeds_held",
            AllocError::EmptyRequest { .. } => "alloc_empty_request",
            AllocError::NonPositiveSurge { .. } => "alloc_non_positive_surge",
            AllocError::SurgeOverflow { .. } => "alloc_surge_overflow",
        }
    }

    /// Indicates whether the caller should simply try again later.
    ///
    /// Returns `true` for [`AllocError::Unavailable`] and [`AllocError::Unsafe`],
    /// `false` for precondition violations.
    ///
    /// # Example
    /// ```
    /// use safevax::{AllocError, ResourceVector};
    ///
    /// let busy = AllocError::Unavailable {
    ///     consumer: "Hospital-2".into(),
    ///     requested: ResourceVector::new(9, 0, 0),
    ///     available: ResourceVector::new(3, 0, 0),
    /// };
    /// assert!(busy.is_retryable());
    ///
    /// let dup = AllocError::AlreadyRegistered { consumer: "Hospital-2".into() };
    /// assert!(!dup.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, AllocError::Unavailable { .. } | AllocError::Unsafe { .. })
    }

    /// Name of the consumer the failed call was made for, if any.
    ///
    /// `None` for a surge rejected before any consumer was looked at.
    pub fn consumer(&self) -> Option<&str> {
        match self {
            AllocError::Unavailable { consumer, .. }
            | AllocError::Unsafe { consumer, .. }
            | AllocError::AlreadyRegistered { consumer }
            | AllocError::UnknownConsumer { consumer }
            | AllocError::ExceedsNeed { consumer, .. }
            | AllocError::ExceedsHeld { consumer, .. }
            | AllocError::EmptyRequest { consumer }
            | AllocError::SurgeOverflow { consumer, .. } => Some(consumer),
            AllocError::NonPositiveSurge { .. } => None,
        }
    }
}

/// # A broken ledger invariant.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// `available + Σ allocated + written_off != total` for one kind.
    #[error(
        "{kind}: available {available} + allocated {allocated} + written off {written_off} != total {total}"
    )]
    Conservation {
        kind: ResourceKind,
        available: u64,
        allocated: u64,
        written_off: u64,
        total: u64,
    },

    /// A consumer holds more than its declared maximum.
    #[error("{consumer}/{kind}: allocated {allocated} exceeds max {max}")]
    AboveMax {
        consumer: Arc<str>,
        kind: ResourceKind,
        allocated: u32,
        max: u32,
    },

    /// `need != max - allocated` for one consumer and kind.
    #[error("{consumer}/{kind}: need {need} != max {max} - allocated {allocated}")]
    NeedMismatch {
        consumer: Arc<str>,
        kind: ResourceKind,
        need: u32,
        max: u32,
        allocated: u32,
    },
}

impl LedgerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LedgerError::Conservation { .. } => "ledger_conservation",
            LedgerError::AboveMax { .. } => "ledger_above_max",
            LedgerError::NeedMismatch { .. } => "ledger_need_mismatch",
        }
    }
}

/// # Errors produced by the simulation runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Grace period was exceeded; some drivers did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of drivers still running.
        stuck: Vec<String>,
    },

    /// `run` was called more than once on the same simulation.
    #[error("simulation already started")]
    AlreadyStarted,

    /// Installing the OS signal listeners failed.
    #[error("signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use safevax::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::AlreadyStarted => "runtime_already_started",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}
