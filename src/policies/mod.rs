//! Driver pacing policies.
//!
//! This module groups the knobs that control **when** a hospital driver acts
//! and **how much** it asks for.
//!
//! ## Contents
//! - [`DriverPolicy`] the strategy seam consulted by every driver iteration
//! - [`RandomPolicy`] default randomized pacing and request sizing
//! - [`ScriptedPolicy`] deterministic queued requests with zero delays
//! - [`BackoffPolicy`] delay schedule after refused requests
//! - [`JitterPolicy`] randomization of backoff delays
//!
//! ## Quick wiring
//! ```text
//! Config { think_min, think_max, treat, denied: BackoffPolicy }
//!      └─► RandomPolicy::from_config(&cfg)
//!           └─► HospitalDriver consults:
//!                - think_delay() before each iteration
//!                - choose_request(need) for the amount
//!                - treat_duration() when need is all-zero
//!                - denied_backoff(n) after the n-th consecutive refusal
//! ```

mod backoff;
mod driver;
mod jitter;

pub use backoff::BackoffPolicy;
pub use driver::{DriverPolicy, RandomPolicy, ScriptedPolicy};
pub use jitter::JitterPolicy;
