//! # Backoff after a refused request.
//!
//! [`BackoffPolicy`] computes how long a hospital waits after its request was
//! refused (stock unavailable or unsafe state) before it tries again.
//!
//! The delay after the `n`-th consecutive refusal (1-based) is
//! `first × factor^(n-1)`, capped at `max`, then jittered. The base is derived
//! from `n` alone, so jitter never feeds back into later delays. A granted
//! request resets `n`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use safevax::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(2),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(1), Duration::from_secs(2));
//! assert_eq!(backoff.next(2), Duration::from_secs(4));
//! assert_eq!(backoff.next(9), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay schedule for consecutive refusals.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay after the first refusal.
    pub first: Duration,
    /// Cap on any delay.
    pub max: Duration,
    /// Growth per additional consecutive refusal (`1.0` = constant).
    pub factor: f64,
    /// Randomization applied to the capped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Constant 2s, capped at 10s, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(2),
            max: Duration::from_secs(10),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after `refusals` consecutive refusals.
    ///
    /// `refusals = 0` is treated as the first refusal.
    pub fn next(&self, refusals: u32) -> Duration {
        let exp = refusals.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        let cap = self.max.as_secs_f64();

        let base = if !secs.is_finite() || secs < 0.0 || secs > cap {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}
