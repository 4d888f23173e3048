//! # One iteration of a hospital driver.
//!
//! [`step`] runs exactly one pass of the driver state machine, without the
//! think pause and without the refusal backoff (both belong to the loop in
//! [`HospitalDriver`](crate::core::HospitalDriver)). Tests call it directly to
//! walk the state machine deterministically.
//!
//! ## State flow
//! ```text
//! Idle ─► Deciding: read need (consistent snapshot)
//!           │
//!           ├─ need == 0 ─► STATUS "Treating Patients (Busy)"
//!           │                 └─ dwell(treat) (cancellable)
//!           │                      └─ Releasing: release_all ─► STATUS "Idle"   → Treated
//!           │
//!           └─ need > 0 ─► choose_request(need)
//!                             ├─ all-zero ─────────────────────────────────────► Skipped
//!                             └─ STATUS "Requesting: V:x S:y T:z"
//!                                  └─ request()
//!                                       ├─ Ok(grant) ──────────────────────────► Granted
//!                                       ├─ Err(retryable) ─────────────────────► Refused
//!                                       └─ Err(precondition) ──────────────────► Err
//! ```
//!
//! ## Rules
//! - `Waiting for Stock` and `Denied (Unsafe State)` statuses come from the
//!   allocator, inside its critical section.
//! - Cancellation during treatment keeps the holdings (no drain on stop).
//! - Non-retryable allocator errors are returned as `Err`; they mean the
//!   policy asked for something invalid.

use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::{
    allocator::{Allocator, Grant},
    error::AllocError,
    events::{Bus, Event},
    policies::DriverPolicy,
    resources::ResourceVector,
};

/// Status text while a fully supplied hospital holds everything.
pub const STATUS_TREATING: &str = "Treating Patients (Busy)";
/// Status text after a hospital released its holdings.
pub const STATUS_IDLE: &str = "Idle";

/// Result of one [`step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The request was admitted.
    Granted {
        /// Amount granted.
        amount: ResourceVector,
        /// How it was admitted.
        grant: Grant,
    },
    /// The request was refused for a retryable reason.
    Refused(AllocError),
    /// Need was zero; the hospital treated and released everything.
    Treated {
        /// Amount returned to the pool.
        released: ResourceVector,
    },
    /// The policy chose an all-zero request; nothing was sent.
    Skipped,
    /// Cancelled while treating; holdings were kept.
    Cancelled,
}

/// Formats the "Requesting" status for `amount`.
pub fn requesting_status(amount: ResourceVector) -> String {
    format!("Requesting: {amount}")
}

/// Runs one driver iteration for `name`.
pub async fn step(
    name: &str,
    allocator: &Allocator,
    policy: &dyn DriverPolicy,
    bus: &Bus,
    token: &CancellationToken,
) -> Result<StepOutcome, AllocError> {
    let need = allocator.need(name)?;

    if need.is_zero() {
        return treat(name, allocator, policy.treat_duration(), bus, token).await;
    }

    let amount = policy.choose_request(need);
    if amount.is_zero() {
        return Ok(StepOutcome::Skipped);
    }

    bus.publish(Event::status(name, requesting_status(amount)));
    match allocator.request(name, amount) {
        Ok(grant) => Ok(StepOutcome::Granted { amount, grant }),
        Err(e) if e.is_retryable() => Ok(StepOutcome::Refused(e)),
        Err(e) => Err(e),
    }
}

async fn treat(
    name: &str,
    allocator: &Allocator,
    dwell: Duration,
    bus: &Bus,
    token: &CancellationToken,
) -> Result<StepOutcome, AllocError> {
    bus.publish(Event::status(name, STATUS_TREATING));

    if !dwell.is_zero() {
        let sleep = time::sleep(dwell);
        tokio::pin!(sleep);
        select! {
            _ = &mut sleep => {}
            _ = token.cancelled() => return Ok(StepOutcome::Cancelled),
        }
    }

    let released = allocator.release_all(name)?;
    bus.publish(Event::status(name, STATUS_IDLE));
    Ok(StepOutcome::Treated { released })
}
