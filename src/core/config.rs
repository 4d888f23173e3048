//! # Global simulation configuration.
//!
//! Provides [`Config`], centralized settings for the pool, the admin shocks,
//! the default driver pacing and the runtime.
//!
//! Config is used in three ways:
//! 1. **Allocator creation**: `Allocator::new(&config, bus)` (total, shocks, initial safety mode)
//! 2. **Simulation creation**: `Simulation::builder(config)` (hospitals, grace, sinks)
//! 3. **Policy defaults**: `RandomPolicy::from_config(&config)` (think/treat/backoff)
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for drivers after cancelling them
//! - `hospitals = 0` → the simulation runs with no drivers (admin surface only)

use std::time::Duration;

use crate::policies::{BackoffPolicy, JitterPolicy};
use crate::resources::{ResourceVector, VectorRange};

/// Global configuration for the simulation.
///
/// ## Field semantics
/// - `total`: Pool capacity at startup
/// - `hospitals`: Number of driver tasks (`Hospital-1..=N`)
/// - `max_demand`: Range each hospital's declared maximum is drawn from
/// - `crash_factor`: Share of `available` that survives a supply crash (clamped to `[0, 1]`)
/// - `surge`: Range the per-kind demand-surge delta is drawn from (components floored at 1)
/// - `safety`: Initial safety mode
/// - `think_min`/`think_max`: Pause before each driver iteration
/// - `treat`: Dwell time of a fully supplied hospital before it releases
/// - `denied`: Backoff after a denied or unavailable request
/// - `grace`: Maximum wait for drivers after cancellation (`0s` = no wait)
/// - `subscriber_capacity`: Default per-subscriber queue size (min 1)
/// - `log_tail`: Number of `LOG` lines kept by the board sink
#[derive(Clone, Debug)]
pub struct Config {
    /// Pool capacity at startup.
    pub total: ResourceVector,

    /// Number of hospitals (driver tasks) to spawn.
    pub hospitals: usize,

    /// Range each hospital's maximum demand is drawn from.
    pub max_demand: VectorRange,

    /// Share of `available` that survives a supply crash.
    ///
    /// `0.5` halves the pool (floored per kind). Clamped to `[0, 1]`.
    pub crash_factor: f64,

    /// Range the demand-surge delta is drawn from.
    ///
    /// One delta per kind is drawn per surge and applied to every hospital.
    pub surge: VectorRange,

    /// Whether the banker's check is on at startup.
    pub safety: bool,

    /// Lower bound of the pause before each driver iteration.
    pub think_min: Duration,

    /// Upper bound of the pause before each driver iteration.
    pub think_max: Duration,

    /// How long a fully supplied hospital treats patients before releasing.
    pub treat: Duration,

    /// Backoff applied after a request is refused.
    pub denied: BackoffPolicy,

    /// Maximum time to wait for drivers to stop once cancelled.
    pub grace: Duration,

    /// Queue capacity for subscribers that do not declare their own.
    pub subscriber_capacity: usize,

    /// Number of `LOG` lines the board keeps.
    pub log_tail: usize,
}

impl Config {
    /// Returns the crash factor clamped to `[0, 1]` (`NaN` → `0`).
    #[inline]
    pub fn crash_factor_clamped(&self) -> f64 {
        if self.crash_factor.is_finite() {
            self.crash_factor.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Returns the grace period as an `Option`.
    ///
    /// - `None` → drivers are cancelled and not awaited
    /// - `Some(d)` → wait up to `d`
    #[inline]
    pub fn grace_period(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns the think interval as `(min, max)` with `min <= max`.
    #[inline]
    pub fn think_bounds(&self) -> (Duration, Duration) {
        (
            self.think_min.min(self.think_max),
            self.think_min.max(self.think_max),
        )
    }

    /// Names of the hospitals to spawn: `Hospital-1..=N`.
    pub fn hospital_names(&self) -> Vec<String> {
        (1..=self.hospitals).map(|i| format!("Hospital-{i}")).collect()
    }

    /// Subscriber queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn subscriber_capacity_clamped(&self) -> usize {
        self.subscriber_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `total = V:60 S:60 T:12`, `hospitals = 5`
    /// - `max_demand = V:15..=25 S:15..=25 T:2..=5`
    /// - `crash_factor = 0.5`, `surge = V:1..=5 S:1..=5 T:1..=2`, `safety = true`
    /// - `think = 1s..=3s`, `treat = 3s`, `denied = 2s constant, no jitter`
    /// - `grace = 5s`, `subscriber_capacity = 1024`, `log_tail = 200`
    fn default() -> Self {
        Self {
            total: ResourceVector::new(60, 60, 12),
            hospitals: 5,
            max_demand: VectorRange::new(
                ResourceVector::new(15, 15, 2),
                ResourceVector::new(25, 25, 5),
            ),
            crash_factor: 0.5,
            surge: VectorRange::new(ResourceVector::new(1, 1, 1), ResourceVector::new(5, 5, 2)),
            safety: true,
            think_min: Duration::from_secs(1),
            think_max: Duration::from_secs(3),
            treat: Duration::from_secs(3),
            denied: BackoffPolicy {
                first: Duration::from_secs(2),
                max: Duration::from_secs(10),
                factor: 1.0,
                jitter: JitterPolicy::None,
            },
            grace: Duration::from_secs(5),
            subscriber_capacity: 1024,
            log_tail: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_and_clamps() {
        let mut cfg = Config::default();
        assert_eq!(cfg.grace_period(), Some(Duration::from_secs(5)));
        cfg.grace = Duration::ZERO;
        assert_eq!(cfg.grace_period(), None);

        cfg.crash_factor = 7.0;
        assert_eq!(cfg.crash_factor_clamped(), 1.0);
        cfg.crash_factor = f64::NAN;
        assert_eq!(cfg.crash_factor_clamped(), 0.0);

        cfg.subscriber_capacity = 0;
        assert_eq!(cfg.subscriber_capacity_clamped(), 1);
    }

    #[test]
    fn test_hospital_names() {
        let cfg = Config {
            hospitals: 3,
            ..Config::default()
        };
        assert_eq!(
            cfg.hospital_names(),
            vec!["Hospital-1", "Hospital-2", "Hospital-3"]
        );
    }

    #[test]
    fn test_think_bounds_are_ordered() {
        let cfg = Config {
            think_min: Duration::from_secs(4),
            think_max: Duration::from_secs(1),
            ..Config::default()
        };
        assert_eq!(
            cfg.think_bounds(),
            (Duration::from_secs(1), Duration::from_secs(4))
        );
    }
}
