//! # HospitalDriver: one autonomous consumer.
//!
//! Registers its hospital once, then loops [`step`](super::step::step)
//! forever with the pauses its [`DriverPolicy`] asks for.
//!
//! ## Loop
//! ```text
//! register(name, max)            (AlreadyRegistered is fine: restartable)
//! loop {
//!   ├─► pause(think_delay)                     (cancellable)
//!   ├─► step()
//!   │     ├─ Granted / Treated ─► refusals = 0
//!   │     ├─ Skipped           ─► continue
//!   │     ├─ Refused           ─► refusals += 1
//!   │     │                      └─► pause(denied_backoff(refusals))   (cancellable)
//!   │     ├─ Cancelled         ─► exit Cancelled
//!   │     └─ Err(precondition) ─► exit Fatal
//!   └─ token cancelled         ─► exit Cancelled
//! }
//! ```
//!
//! ## Rules
//! - Iterations run **sequentially** within one driver.
//! - Cancellation is observed at pauses and during treatment only; an
//!   allocator call in progress always completes.
//! - Stopping never releases holdings.

use std::{sync::Arc, time::Duration};

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::{
    allocator::Allocator,
    core::step::{StepOutcome, step},
    error::AllocError,
    events::Bus,
    policies::DriverPolicy,
    resources::ResourceVector,
};

/// Why a driver loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverExit {
    /// The runtime token was cancelled.
    Cancelled,
    /// The allocator rejected a call as a precondition violation.
    Fatal(AllocError),
}

/// Drives one hospital against the shared allocator.
pub struct HospitalDriver {
    /// Hospital name, unique per allocator.
    pub name: Arc<str>,
    /// Declared maximum demand registered at start.
    pub max: ResourceVector,
    /// Shared allocator.
    pub allocator: Arc<Allocator>,
    /// Bus for status events.
    pub bus: Bus,
    /// Pacing and request sizing.
    pub policy: Arc<dyn DriverPolicy>,
}

impl HospitalDriver {
    /// Creates a new driver.
    pub fn new(
        name: impl Into<Arc<str>>,
        max: ResourceVector,
        allocator: Arc<Allocator>,
        bus: Bus,
        policy: Arc<dyn DriverPolicy>,
    ) -> Self {
        Self {
            name: name.into(),
            max,
            allocator,
            bus,
            policy,
        }
    }

    /// Runs the driver until `token` is cancelled or a fatal error occurs.
    pub async fn run(self, token: CancellationToken) -> DriverExit {
        match self.allocator.register(&self.name, self.max) {
            Ok(()) | Err(AllocError::AlreadyRegistered { .. }) => {}
            Err(e) => return DriverExit::Fatal(e),
        }

        let mut refusals: u32 = 0;
        loop {
            if !pause(self.policy.think_delay(), &token).await {
                return DriverExit::Cancelled;
            }

            let outcome = step(
                &self.name,
                &self.allocator,
                self.policy.as_ref(),
                &self.bus,
                &token,
            )
            .await;

            match outcome {
                Ok(StepOutcome::Granted { .. } | StepOutcome::Treated { .. }) => refusals = 0,
                Ok(StepOutcome::Skipped) => {}
                Ok(StepOutcome::Refused(e)) => {
                    refusals = refusals.saturating_add(1);
                    tracing::debug!(
                        hospital = %self.name,
                        reason = e.as_label(),
                        refusals,
                        "request refused"
                    );
                    if !pause(self.policy.denied_backoff(refusals), &token).await {
                        return DriverExit::Cancelled;
                    }
                }
                Ok(StepOutcome::Cancelled) => return DriverExit::Cancelled,
                Err(e) => {
                    tracing::error!(
                        hospital = %self.name,
                        error = %e,
                        label = e.as_label(),
                        "driver stopped"
                    );
                    return DriverExit::Fatal(e);
                }
            }
        }
    }
}

/// Waits `delay` unless `token` fires first; returns `false` when cancelled.
async fn pause(delay: Duration, token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        tokio::task::yield_now().await;
        return !token.is_cancelled();
    }
    let sleep = time::sleep(delay);
    tokio::pin!(sleep);
    select! {
        _ = &mut sleep => true,
        _ = token.cancelled() => false,
    }
}
