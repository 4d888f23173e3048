//! # Built-in subscribers
//!
//! - [`Board`]: folds events into the latest pool/hospital view (console, tests).
//! - [`LogWriter`]: structured `tracing` output of every event (feature `logging`).

mod board;
#[cfg(feature = "logging")]
mod log;

pub use board::{Board, BoardRow, BoardState, LogLine, Tone};
#[cfg(feature = "logging")]
pub use log::LogWriter;
