//! Resource data model.
//!
//! ## Contents
//! - [`ResourceKind`] the closed set of pooled resource kinds
//! - [`ResourceVector`] one quantity per kind, with componentwise arithmetic
//! - [`VectorRange`] per-kind inclusive bounds for random draws
//! - [`Ledger`], [`Account`] the pool's bookkeeping (no lock, no policy)

mod kind;
mod ledger;
mod vector;

pub use kind::ResourceKind;
pub use ledger::{Account, Ledger};
pub use vector::{ResourceVector, VectorRange};
