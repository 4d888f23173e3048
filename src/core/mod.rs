//! Runtime core: configuration, hospital drivers and orchestration.
//!
//! Internal modules:
//! - [`config`]: global settings and defaults;
//! - [`step`]: one iteration of the driver state machine;
//! - [`driver`]: the per-hospital loop with pauses and refusal backoff;
//! - [`simulation`]: spawns drivers, fans events out, handles shutdown;
//! - [`builder`]: assembles a [`Simulation`];
//! - [`shutdown`]: cross-platform termination signals.

mod builder;
mod config;
mod driver;
mod shutdown;
mod simulation;
mod step;

pub use builder::SimulationBuilder;
pub use config::Config;
pub use driver::{DriverExit, HospitalDriver};
pub use shutdown::{ShutdownSignal, wait_for_shutdown_signal};
pub use simulation::Simulation;
pub use step::{STATUS_IDLE, STATUS_TREATING, StepOutcome, requesting_status, step};
