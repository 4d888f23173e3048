//! Banker's-algorithm allocation.
//!
//! - [`oracle`] pure safe-state check over a ledger
//! - [`Allocator`] serialized request/release/admin entry point

pub mod oracle;
mod pool;

pub use pool::{Allocator, Grant, STATUS_DENIED, STATUS_WAITING};
