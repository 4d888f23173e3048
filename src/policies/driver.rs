//! # Pluggable pacing and request sizing for hospital drivers.
//!
//! The driver state machine is fixed; *when* it acts and *how much* it asks
//! for are delegated to a [`DriverPolicy`]. Any request that fits within the
//! remaining need is acceptable to the allocator.
//!
//! - [`RandomPolicy`] the default: random pauses, random sub-vector of need
//! - [`ScriptedPolicy`] deterministic: queued requests, zero delays (tests)

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;

use crate::core::Config;
use crate::policies::BackoffPolicy;
use crate::resources::ResourceVector;

/// Strategy consulted by a hospital driver on every iteration.
pub trait DriverPolicy: Send + Sync + 'static {
    /// Pause before the next iteration.
    fn think_delay(&self) -> Duration;

    /// Amount to request given the remaining `need` (never all-zero here).
    ///
    /// Must fit within `need`; an all-zero answer skips the iteration.
    fn choose_request(&self, need: ResourceVector) -> ResourceVector;

    /// How long a fully supplied hospital holds everything before releasing.
    fn treat_duration(&self) -> Duration;

    /// Extra pause after the `refusals`-th consecutive refused request.
    fn denied_backoff(&self, refusals: u32) -> Duration;
}

/// Default randomized policy.
///
/// - think: uniform in `[think_min, think_max]`
/// - request: per kind, uniform in `1..=need` (0 when nothing is needed)
/// - treat: fixed
/// - refusals: [`BackoffPolicy`]
#[derive(Clone, Debug)]
pub struct RandomPolicy {
    /// Shortest pause between iterations.
    pub think_min: Duration,
    /// Longest pause between iterations.
    pub think_max: Duration,
    /// Treatment dwell time.
    pub treat: Duration,
    /// Backoff after refusals.
    pub denied: BackoffPolicy,
}

impl RandomPolicy {
    /// Builds the policy from the pacing fields of `cfg`.
    pub fn from_config(cfg: &Config) -> Self {
        let (think_min, think_max) = cfg.think_bounds();
        Self {
            think_min,
            think_max,
            treat: cfg.treat,
            denied: cfg.denied,
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DriverPolicy for RandomPolicy {
    fn think_delay(&self) -> Duration {
        let lo = self.think_min.as_millis().min(u128::from(u64::MAX)) as u64;
        let hi = self.think_max.as_millis().min(u128::from(u64::MAX)) as u64;
        if hi <= lo {
            return self.think_min;
        }
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }

    fn choose_request(&self, need: ResourceVector) -> ResourceVector {
        let mut rng = rand::rng();
        need.map(|n| if n == 0 { 0 } else { rng.random_range(1..=n) })
    }

    fn treat_duration(&self) -> Duration {
        self.treat
    }

    fn denied_backoff(&self, refusals: u32) -> Duration {
        self.denied.next(refusals)
    }
}

/// Deterministic policy: pops queued requests, fixed pauses (zero by default).
///
/// When the queue is empty it asks for the whole remaining need. Queued
/// requests are passed through unchanged, so a script can deliberately send
/// a request the allocator will reject.
///
/// ```rust
/// use safevax::{DriverPolicy, ResourceVector, ScriptedPolicy};
///
/// let p = ScriptedPolicy::new([ResourceVector::new(1, 0, 0)]);
/// let need = ResourceVector::new(3, 2, 1);
/// assert_eq!(p.choose_request(need), ResourceVector::new(1, 0, 0));
/// assert_eq!(p.choose_request(need), need);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedPolicy {
    queue: Mutex<VecDeque<ResourceVector>>,
    think: Duration,
    treat: Duration,
}

impl ScriptedPolicy {
    /// Creates a policy that returns `requests` in order.
    pub fn new(requests: impl IntoIterator<Item = ResourceVector>) -> Self {
        Self {
            queue: Mutex::new(requests.into_iter().collect()),
            think: Duration::ZERO,
            treat: Duration::ZERO,
        }
    }

    /// Sets the pause before every iteration (default zero).
    pub fn with_think(mut self, think: Duration) -> Self {
        self.think = think;
        self
    }

    /// Sets the treatment dwell time (default zero).
    pub fn with_treat(mut self, treat: Duration) -> Self {
        self.treat = treat;
        self
    }

    /// Appends one more scripted request.
    pub fn push(&self, request: ResourceVector) {
        self.queue.lock().push_back(request);
    }

    /// Number of scripted requests not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

impl DriverPolicy for ScriptedPolicy {
    fn think_delay(&self) -> Duration {
        self.think
    }

    fn choose_request(&self, need: ResourceVector) -> ResourceVector {
        self.queue.lock().pop_front().unwrap_or(need)
    }

    fn treat_duration(&self) -> Duration {
        self.treat
    }

    fn denied_backoff(&self, _refusals: u32) -> Duration {
        Duration::ZERO
    }
}
