//! # Resource ledger: the pool's bookkeeping.
//!
//! [`Ledger`] holds the total/available/written-off vectors and one
//! [`Account`] (max, allocated, need) per registered consumer. It has no lock
//! and no policy: the [`Allocator`](crate::Allocator) owns the only instance,
//! mutates it under its mutex and hands out clones as snapshots.
//!
//! ## Invariants
//! ```text
//! for every kind r:      available[r] + Σ allocated[c][r] + written_off[r] == total[r]
//! for every consumer c:  allocated[c] <= max[c]
//!                        need[c] == max[c] - allocated[c]
//! ```
//! `written_off` starts at zero and only grows on a supply crash, so until the
//! first crash the first line is the plain conservation law.
//!
//! Accounts are kept in registration order; every scan over them is
//! deterministic.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::LedgerError;
use crate::resources::{ResourceKind, ResourceVector};

/// One consumer's row in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    name: Arc<str>,
    max: ResourceVector,
    allocated: ResourceVector,
    need: ResourceVector,
}

impl Account {
    fn new(name: Arc<str>, max: ResourceVector) -> Self {
        Self {
            name,
            max,
            allocated: ResourceVector::ZERO,
            need: max,
        }
    }

    /// Consumer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the consumer name.
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Declared maximum demand.
    pub fn max(&self) -> ResourceVector {
        self.max
    }

    /// Current holdings.
    pub fn allocated(&self) -> ResourceVector {
        self.allocated
    }

    /// Remaining need (`max - allocated`).
    pub fn need(&self) -> ResourceVector {
        self.need
    }
}

/// In-memory accounting of the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    total: ResourceVector,
    available: ResourceVector,
    written_off: ResourceVector,
    accounts: Vec<Account>,
    index: HashMap<Arc<str>, usize>,
}

impl Ledger {
    /// Creates a ledger with everything available and no consumers.
    pub fn new(total: ResourceVector) -> Self {
        Self {
            total,
            available: total,
            written_off: ResourceVector::ZERO,
            accounts: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Capacity at startup (display state after a supply crash).
    pub fn total(&self) -> ResourceVector {
        self.total
    }

    /// Unallocated capacity; the only input to admission decisions.
    pub fn available(&self) -> ResourceVector {
        self.available
    }

    /// Capacity destroyed by supply crashes so far.
    pub fn written_off(&self) -> ResourceVector {
        self.written_off
    }

    /// Sum of all consumers' holdings.
    pub fn allocated_total(&self) -> ResourceVector {
        self.accounts.iter().map(Account::allocated).sum()
    }

    /// All accounts in registration order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Looks up an account by consumer name.
    pub fn account(&self, name: &str) -> Option<&Account> {
        self.position(name).map(|i| &self.accounts[i])
    }

    /// Number of registered consumers.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True if nobody has registered yet.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn account_at(&self, index: usize) -> &Account {
        &self.accounts[index]
    }

    /// Adds a new account; returns `None` if the name is taken.
    pub(crate) fn register(&mut self, name: Arc<str>, max: ResourceVector) -> Option<usize> {
        if self.index.contains_key(&name) {
            return None;
        }
        let pos = self.accounts.len();
        self.index.insert(Arc::clone(&name), pos);
        self.accounts.push(Account::new(name, max));
        Some(pos)
    }

    /// Moves `amount` from the pool to the account.
    ///
    /// Caller guarantees `amount <= available` and `amount <= need`.
    pub(crate) fn apply_grant(&mut self, index: usize, amount: ResourceVector) {
        let acct = &mut self.accounts[index];
        self.available -= amount;
        acct.allocated += amount;
        acct.need -= amount;
    }

    /// Exact inverse of [`apply_grant`](Self::apply_grant).
    pub(crate) fn revert_grant(&mut self, index: usize, amount: ResourceVector) {
        let acct = &mut self.accounts[index];
        self.available += amount;
        acct.allocated -= amount;
        acct.need += amount;
    }

    /// Moves `amount` from the account back to the pool.
    ///
    /// Caller guarantees `amount <= allocated`.
    pub(crate) fn apply_release(&mut self, index: usize, amount: ResourceVector) {
        self.revert_grant(index, amount);
    }

    /// Scales `available` down by `factor` and books the loss as written off.
    ///
    /// Returns the amount destroyed.
    pub(crate) fn shrink_available(&mut self, factor: f64) -> ResourceVector {
        let kept = self.available.scaled_down(factor);
        let lost = self.available - kept;
        self.available = kept;
        self.written_off += lost;
        lost
    }

    /// Raises every account's max and need by `delta`.
    ///
    /// All or nothing: if some account's max would overflow, nothing changes
    /// and the index of the first such account is returned.
    pub(crate) fn raise_demand(&mut self, delta: ResourceVector) -> Result<(), usize> {
        let raised = self
            .accounts
            .iter()
            .enumerate()
            .map(|(i, acct)| acct.max.checked_add(&delta).ok_or(i))
            .collect::<Result<Vec<_>, _>>()?;
        for (acct, max) in self.accounts.iter_mut().zip(raised) {
            acct.max = max;
            acct.need = max - acct.allocated;
        }
        Ok(())
    }

    /// Verifies the bookkeeping invariants, returning the first violation.
    pub fn check_invariants(&self) -> Result<(), LedgerError> {
        let allocated = self.allocated_total();
        for kind in ResourceKind::ALL {
            let lhs = u64::from(self.available[kind])
                + u64::from(allocated[kind])
                + u64::from(self.written_off[kind]);
            if lhs != u64::from(self.total[kind]) {
                return Err(LedgerError::Conservation {
                    kind,
                    available: u64::from(self.available[kind]),
                    allocated: u64::from(allocated[kind]),
                    written_off: u64::from(self.written_off[kind]),
                    total: u64::from(self.total[kind]),
                });
            }
        }

        for acct in &self.accounts {
            for kind in ResourceKind::ALL {
                let (max, held, need) = (acct.max[kind], acct.allocated[kind], acct.need[kind]);
                if held > max {
                    return Err(LedgerError::AboveMax {
                        consumer: acct.name_arc(),
                        kind,
                        allocated: held,
                        max,
                    });
                }
                if need != max - held {
                    return Err(LedgerError::NeedMismatch {
                        consumer: acct.name_arc(),
                        kind,
                        need,
                        max,
                        allocated: held,
                    });
                }
            }
        }
        Ok(())
    }
}
