//! # Jitter for driver pauses.
//!
//! [`JitterPolicy`] randomizes a backoff delay so that hospitals refused at the
//! same moment do not all come back at the same moment.
//!
//! - [`JitterPolicy::None`] exact delay
//! - [`JitterPolicy::Full`] uniform in `[0, delay]`
//! - [`JitterPolicy::Equal`] `delay/2 + uniform[0, delay/2]`

use std::time::Duration;

use rand::Rng;

/// Randomization applied to a computed backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the delay as computed.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Half the delay plus uniform `[0, delay/2]`.
    Equal,
}

impl JitterPolicy {
    /// Applies the jitter to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return delay;
        }
        let mut rng = rand::rng();
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(rng.random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rng.random_range(0..=ms - half))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        let d = Duration::from_millis(1234);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn test_full_within_bounds() {
        let d = Duration::from_millis(500);
        for _ in 0..100 {
            assert!(JitterPolicy::Full.apply(d) <= d);
        }
    }

    #[test]
    fn test_equal_within_bounds() {
        let d = Duration::from_millis(1001);
        for _ in 0..100 {
            let j = JitterPolicy::Equal.apply(d);
            assert!(j >= Duration::from_millis(500));
            assert!(j <= d);
        }
    }

    #[test]
    fn test_zero_delay_stays_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
