//! # Safety oracle: banker's safe-state analysis.
//!
//! Decides whether a ledger state is *safe*: whether some order of the
//! registered consumers exists in which each one can receive its full
//! remaining need from the running `work` pool and then return everything it
//! holds.
//!
//! ## Algorithm
//! ```text
//! work     = available
//! finished = [false; n]
//! loop {
//!     progress = false
//!     for c in registration order, not finished:
//!         if need[c] <= work (every kind):
//!             work += allocated[c]; finished[c] = true; progress = true
//!     if !progress: break
//! }
//! safe = all(finished)
//! ```
//! Full passes are repeated until one finishes nobody, so the answer does
//! not depend on scan order; only the reported finishing order does.
//! Worst case O(n²·m).
//!
//! The oracle is pure: it reads the view it is given and nothing else.

use crate::resources::{Ledger, ResourceVector};

/// Returns `true` if the ledger is in a safe state.
///
/// A ledger with no consumers is trivially safe.
pub fn is_safe(ledger: &Ledger) -> bool {
    safe_sequence(ledger).is_some()
}

/// Returns the finishing order (account indices) if the ledger is safe.
pub fn safe_sequence(ledger: &Ledger) -> Option<Vec<usize>> {
    evaluate(
        ledger.available(),
        ledger.accounts().iter().map(|a| (a.need(), a.allocated())),
    )
}

/// Runs the analysis on a raw view: the available pool and one
/// `(need, allocated)` pair per consumer, in a stable order.
///
/// ```rust
/// use safevax::{oracle, ResourceVector};
///
/// // Only the second consumer can finish first; its holdings then free the first.
/// let order = oracle::evaluate(
///     ResourceVector::new(1, 0, 0),
///     [
///         (ResourceVector::new(3, 0, 0), ResourceVector::new(0, 0, 0)),
///         (ResourceVector::new(1, 0, 0), ResourceVector::new(2, 0, 0)),
///     ],
/// );
/// assert_eq!(order, Some(vec![1, 0]));
/// ```
pub fn evaluate<I>(available: ResourceVector, claims: I) -> Option<Vec<usize>>
where
    I: IntoIterator<Item = (ResourceVector, ResourceVector)>,
{
    let claims: Vec<(ResourceVector, ResourceVector)> = claims.into_iter().collect();
    let mut work = available;
    let mut finished = vec![false; claims.len()];
    let mut order = Vec::with_capacity(claims.len());

    loop {
        let mut progress = false;
        for (i, (need, allocated)) in claims.iter().enumerate() {
            if finished[i] || !need.fits_within(&work) {
                continue;
            }
            work += *allocated;
            finished[i] = true;
            order.push(i);
            progress = true;
        }
        if !progress {
            break;
        }
    }

    if order.len() == claims.len() {
        Some(order)
    } else {
        None
    }
}
