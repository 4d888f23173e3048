//! # safevax
//!
//! **safevax** is a deadlock-avoiding resource allocator built around the
//! banker's safe-state check, together with an async simulation of hospitals
//! competing for vaccines, syringes and delivery trucks.
//!
//! Every grant is provisionally applied, checked for a safe finishing order
//! and either kept or rolled back exactly, all inside one critical section.
//! Operators can turn the check off, crash the supply or surge every
//! hospital's demand to watch the failure modes.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │HospitalDriver│   │HospitalDriver│   │HospitalDriver│     operator / console
//!     │ (Hospital-1) │   │ (Hospital-2) │   │ (Hospital-N) │     (set_safety, crash,
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘      surge)
//!            │ request/release  │                  │                    │
//!            ▼                  ▼                  ▼                    ▼
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │  Allocator  (one parking_lot::Mutex over the Ledger)                      │
//! │   provisional commit ─► oracle::safe_sequence ─► keep │ exact rollback    │
//! └──────────────────────────────────┬────────────────────────────────────────┘
//!                                    │ publish under the lock (seq = commit order)
//!                                    ▼
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                 Bus (unbounded mpsc, one seq counter)                     │
//! └──────────────────────────────────┬────────────────────────────────────────┘
//!                                    ▼
//!                       ┌────────────────────────┐
//!                       │  Simulation listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                    LogWriter    Board      custom
//! ```
//!
//! ### Driver lifecycle
//! ```text
//! register(name, max)
//! loop {
//!   ├─► think pause (cancellable)
//!   ├─► need == 0 ? ─► "Treating Patients (Busy)" ─► dwell ─► release_all ─► "Idle"
//!   │                                                  (cancellable; holdings kept on stop)
//!   └─► need > 0  ? ─► "Requesting: V:x S:y T:z" ─► request()
//!                        ├─ Granted (Safe | Risky) ─► refusals = 0
//!                        ├─ Unavailable / Unsafe   ─► backoff(refusals) (cancellable)
//!                        └─ precondition error     ─► driver exits (Fatal)
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Data model**    | Closed resource kinds, per-kind vectors, the ledger.     | [`ResourceKind`], [`ResourceVector`], [`Ledger`] |
//! | **Allocation**    | Serialized request/release/admin with the safety check.  | [`Allocator`], [`Grant`], [`oracle`]        |
//! | **Drivers**       | One task per hospital, pluggable pacing.                 | [`HospitalDriver`], [`DriverPolicy`]        |
//! | **Events**        | Ordered notification stream.                             | [`Bus`], [`Event`], [`EventKind`]           |
//! | **Subscribers**   | Fan-out to sinks with panic isolation.                   | [`Subscribe`], [`SubscriberSet`], [`Board`] |
//! | **Runtime**       | Spawning, OS signals, graceful shutdown.                 | [`Simulation`], [`SimulationBuilder`]       |
//! | **Errors**        | Typed per-layer errors.                                  | [`AllocError`], [`LedgerError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a `tracing` subscriber for every event.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use safevax::{Board, Config, ResourceVector, ScriptedPolicy, Simulation, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let board = Arc::new(Board::new(50));
//!     let policy = ScriptedPolicy::new([]).with_think(Duration::from_millis(20));
//!
//!     let sim = Simulation::builder(Config::default())
//!         .with_hospitals([("Hospital-1", ResourceVector::new(20, 20, 3))])
//!         .with_policy(Arc::new(policy))
//!         .with_subscriber(board.clone() as Arc<dyn Subscribe>)
//!         .build();
//!
//!     let runner = Arc::clone(&sim);
//!     let run = tokio::spawn(async move { runner.run().await });
//!
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     sim.allocator().trigger_supply_crash();
//!     sim.shutdown();
//!     run.await??;
//!
//!     assert!(sim.allocator().snapshot().check_invariants().is_ok());
//!     assert!(board.snapshot().await.row("Hospital-1").is_some());
//!     Ok(())
//! }
//! ```

mod allocator;
mod core;
mod error;
mod events;
mod policies;
mod resources;
mod subscribers;

// ---- Public re-exports ----

pub use allocator::{Allocator, Grant, STATUS_DENIED, STATUS_WAITING, oracle};
pub use crate::core::{
    Config, DriverExit, HospitalDriver, STATUS_IDLE, STATUS_TREATING, ShutdownSignal, Simulation,
    SimulationBuilder, StepOutcome, requesting_status, step, wait_for_shutdown_signal,
};
pub use error::{AllocError, LedgerError, RuntimeError};
pub use events::{Bus, Event, EventKind, EventStream, LogLevel, Payload};
pub use policies::{BackoffPolicy, DriverPolicy, JitterPolicy, RandomPolicy, ScriptedPolicy};
pub use resources::{Account, Ledger, ResourceKind, ResourceVector, VectorRange};
pub use subscribers::{Board, BoardRow, BoardState, LogLine, Subscribe, SubscriberSet, Tone};

// Optional: structured event logging through `tracing`.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
