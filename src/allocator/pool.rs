//! # Allocator: the serialized entry point to the pool.
//!
//! [`Allocator`] owns the [`Ledger`] behind one `parking_lot::Mutex`. Every
//! operation (register, request, release, admin toggles) runs entirely inside
//! that lock and returns without suspending; refused requests are terminated
//! calls, retry is the caller's business.
//!
//! ## Request flow
//! ```text
//! request(name, amount)
//!   ├─ unknown name / empty / amount > need ─► Err(precondition), no event
//!   ├─ amount > available ───────────────────► Err(Unavailable), LOG + STATUS "Waiting for Stock"
//!   ├─ provisional commit (available -= a, allocated += a, need -= a)
//!   ├─ safety off ───────────────────────────► Ok(Risky),  LOG(risk) + GLOBAL + HOSPITAL_UPDATE
//!   └─ oracle(ledger)
//!        ├─ safe   ──────────────────────────► Ok(Safe),   LOG + GLOBAL + HOSPITAL_UPDATE
//!        └─ unsafe ─► exact rollback ────────► Err(Unsafe), LOG + STATUS "Denied (Unsafe State)"
//! ```
//!
//! ## Rules
//! - The provisional state is never observable: commit, check and rollback
//!   happen under the same guard.
//! - Events are published under the lock, so bus order equals commit order.
//! - Failed calls leave the ledger bit-identical.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::allocator::oracle;
use crate::core::Config;
use crate::error::AllocError;
use crate::events::{Bus, Event, LogLevel};
use crate::resources::{Ledger, ResourceVector, VectorRange};

/// Status text published when a request waits for stock.
pub const STATUS_WAITING: &str = "Waiting for Stock";
/// Status text published when a request is denied by the safety check.
pub const STATUS_DENIED: &str = "Denied (Unsafe State)";

/// How a successful request was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grant {
    /// Admitted after the safety check confirmed a safe state.
    Safe,
    /// Admitted with the safety check disabled.
    Risky,
}

struct State {
    ledger: Ledger,
    safety: bool,
}

/// Thread-safe, serialized resource allocator.
///
/// Share it as `Arc<Allocator>`; all methods take `&self`.
///
/// ```rust
/// use safevax::{Allocator, Bus, Grant, ResourceVector};
///
/// let (bus, _stream) = Bus::channel();
/// let alloc = Allocator::with_total(ResourceVector::new(10, 10, 2), bus);
/// alloc.register("A", ResourceVector::new(6, 4, 1)).unwrap();
///
/// assert_eq!(alloc.request("A", ResourceVector::new(4, 2, 0)), Ok(Grant::Safe));
/// assert_eq!(alloc.available(), ResourceVector::new(6, 8, 2));
/// ```
pub struct Allocator {
    state: Mutex<State>,
    bus: Bus,
    crash_factor: f64,
    surge: VectorRange,
}

impl Allocator {
    /// Creates an allocator from the pool and shock settings of `cfg`.
    pub fn new(cfg: &Config, bus: Bus) -> Self {
        let alloc = Self {
            state: Mutex::new(State {
                ledger: Ledger::new(cfg.total),
                safety: cfg.safety,
            }),
            bus,
            crash_factor: cfg.crash_factor_clamped(),
            surge: cfg.surge,
        };
        alloc.bus.publish(Event::global(cfg.total));
        alloc
    }

    /// Creates an allocator with `total` capacity and default shock settings.
    pub fn with_total(total: ResourceVector, bus: Bus) -> Self {
        Self::new(
            &Config {
                total,
                ..Config::default()
            },
            bus,
        )
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }

    fn log(&self, level: LogLevel, text: String) {
        self.bus.publish(Event::log(level, text));
    }

    /// Registers a consumer with its declared maximum demand.
    ///
    /// Emits `LOG` + `HOSPITAL_INIT`.
    pub fn register(&self, name: &str, max: ResourceVector) -> Result<(), AllocError> {
        let mut st = self.lock();
        let name: Arc<str> = Arc::from(name);
        if st.ledger.register(Arc::clone(&name), max).is_none() {
            return Err(AllocError::AlreadyRegistered { consumer: name });
        }
        self.log(LogLevel::Info, format!("[SYSTEM] Registered {name} (max {max})"));
        self.bus
            .publish(Event::hospital_init(name, max, ResourceVector::ZERO));
        debug_assert!(st.ledger.check_invariants().is_ok());
        Ok(())
    }

    /// Requests `amount` for `name`.
    ///
    /// Returns how the grant was admitted, or why it was refused. Refusals
    /// never change the ledger.
    pub fn request(&self, name: &str, amount: ResourceVector) -> Result<Grant, AllocError> {
        let mut st = self.lock();
        let idx = st
            .ledger
            .position(name)
            .ok_or_else(|| AllocError::UnknownConsumer {
                consumer: name.into(),
            })?;
        let consumer = st.ledger.account_at(idx).name_arc();

        if amount.is_zero() {
            return Err(AllocError::EmptyRequest { consumer });
        }
        let need = st.ledger.account_at(idx).need();
        if !amount.fits_within(&need) {
            return Err(AllocError::ExceedsNeed {
                consumer,
                requested: amount,
                need,
            });
        }

        let available = st.ledger.available();
        if !amount.fits_within(&available) {
            self.log(
                LogLevel::Warn,
                format!("[WAIT] {consumer} waiting for physical items ({amount} > {available})"),
            );
            self.bus
                .publish(Event::status(Arc::clone(&consumer), STATUS_WAITING));
            return Err(AllocError::Unavailable {
                consumer,
                requested: amount,
                available,
            });
        }

        st.ledger.apply_grant(idx, amount);

        if !st.safety {
            self.log(
                LogLevel::Risk,
                format!("[RISKY] {consumer} granted {amount} with safety check OFF"),
            );
            self.publish_holdings(&st.ledger, idx);
            debug_assert!(st.ledger.check_invariants().is_ok());
            return Ok(Grant::Risky);
        }

        match oracle::safe_sequence(&st.ledger) {
            Some(order) => {
                let order = order
                    .iter()
                    .map(|&i| st.ledger.account_at(i).name())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                self.log(
                    LogLevel::Info,
                    format!("[GRANTED] {consumer} request {amount} approved. Safe sequence: {order}"),
                );
                self.publish_holdings(&st.ledger, idx);
                debug_assert!(st.ledger.check_invariants().is_ok());
                Ok(Grant::Safe)
            }
            None => {
                st.ledger.revert_grant(idx, amount);
                self.log(
                    LogLevel::Warn,
                    format!("[UNSAFE] {consumer} request {amount} DENIED by banker's check"),
                );
                self.bus
                    .publish(Event::status(Arc::clone(&consumer), STATUS_DENIED));
                Err(AllocError::Unsafe {
                    consumer,
                    requested: amount,
                })
            }
        }
    }

    /// Returns `amount` from `name` to the pool.
    ///
    /// Emits `LOG` + `GLOBAL` + `HOSPITAL_UPDATE`.
    pub fn release(&self, name: &str, amount: ResourceVector) -> Result<(), AllocError> {
        let mut st = self.lock();
        let idx = st
            .ledger
            .position(name)
            .ok_or_else(|| AllocError::UnknownConsumer {
                consumer: name.into(),
            })?;
        let held = st.ledger.account_at(idx).allocated();
        if !amount.fits_within(&held) {
            return Err(AllocError::ExceedsHeld {
                consumer: st.ledger.account_at(idx).name_arc(),
                released: amount,
                held,
            });
        }
        self.commit_release(&mut st.ledger, idx, amount);
        Ok(())
    }

    /// Returns everything `name` holds to the pool in one critical section.
    ///
    /// Returns the released amount.
    pub fn release_all(&self, name: &str) -> Result<ResourceVector, AllocError> {
        let mut st = self.lock();
        let idx = st
            .ledger
            .position(name)
            .ok_or_else(|| AllocError::UnknownConsumer {
                consumer: name.into(),
            })?;
        let held = st.ledger.account_at(idx).allocated();
        self.commit_release(&mut st.ledger, idx, held);
        Ok(held)
    }

    fn commit_release(&self, ledger: &mut Ledger, idx: usize, amount: ResourceVector) {
        ledger.apply_release(idx, amount);
        let name = ledger.account_at(idx).name_arc();
        self.log(
            LogLevel::Info,
            format!("[RELEASE] {name} returned {amount}"),
        );
        self.publish_holdings(ledger, idx);
        debug_assert!(ledger.check_invariants().is_ok());
    }

    fn publish_holdings(&self, ledger: &Ledger, idx: usize) {
        let acct = ledger.account_at(idx);
        self.bus.publish(Event::global(ledger.available()));
        self.bus
            .publish(Event::hospital_update(acct.name_arc(), acct.allocated()));
    }

    /// Turns the banker's check on or off.
    ///
    /// Emits one `LOG` line; the ledger is untouched.
    pub fn set_safety(&self, enabled: bool) {
        let mut st = self.lock();
        st.safety = enabled;
        if enabled {
            self.log(LogLevel::Info, "[ADMIN] Safety check ENABLED".to_string());
        } else {
            self.log(
                LogLevel::Warn,
                "[ADMIN] Safety check DISABLED, grants are no longer deadlock-checked".to_string(),
            );
        }
    }

    /// Current safety mode.
    pub fn safety_enabled(&self) -> bool {
        self.lock().safety
    }

    /// Destroys part of the available pool (`available × crash_factor`, floored).
    ///
    /// Holdings are untouched. Returns the destroyed amount. Emits `LOG` + `GLOBAL`.
    pub fn trigger_supply_crash(&self) -> ResourceVector {
        let mut st = self.lock();
        let lost = st.ledger.shrink_available(self.crash_factor);
        let available = st.ledger.available();
        self.log(
            LogLevel::Warn,
            format!("[ADMIN] Supply crash: lost {lost}, available now {available}"),
        );
        self.bus.publish(Event::global(available));
        debug_assert!(st.ledger.check_invariants().is_ok());
        lost
    }

    /// Raises every consumer's max and need by a random positive delta per kind.
    ///
    /// One delta vector is drawn per call and applied to everyone. Returns it.
    pub fn trigger_demand_surge(&self) -> Result<ResourceVector, AllocError> {
        let delta = self.surge.sample(&mut rand::rng()).map(|q| q.max(1));
        self.trigger_demand_surge_by(delta)?;
        Ok(delta)
    }

    /// Raises every consumer's max and need by `delta`.
    ///
    /// Every component of `delta` must be positive, and no account's max may
    /// overflow; otherwise the call fails and the ledger is untouched.
    /// Emits `LOG` + one `HOSPITAL_INIT` per consumer (their max changed).
    pub fn trigger_demand_surge_by(&self, delta: ResourceVector) -> Result<(), AllocError> {
        if delta.iter().any(|(_, q)| q == 0) {
            return Err(AllocError::NonPositiveSurge { delta });
        }
        let mut st = self.lock();
        if let Err(idx) = st.ledger.raise_demand(delta) {
            let acct = st.ledger.account_at(idx);
            return Err(AllocError::SurgeOverflow {
                consumer: acct.name_arc(),
                max: acct.max(),
                delta,
            });
        }
        self.log(
            LogLevel::Warn,
            format!("[ADMIN] Demand surge: every hospital needs {delta} more"),
        );
        for acct in st.ledger.accounts() {
            self.bus.publish(Event::hospital_init(
                acct.name_arc(),
                acct.max(),
                acct.allocated(),
            ));
        }
        debug_assert!(st.ledger.check_invariants().is_ok());
        Ok(())
    }

    /// Consistent snapshot of `name`'s remaining need.
    pub fn need(&self, name: &str) -> Result<ResourceVector, AllocError> {
        self.account_field(name, |a| a.need())
    }

    /// Consistent snapshot of `name`'s holdings.
    pub fn allocated(&self, name: &str) -> Result<ResourceVector, AllocError> {
        self.account_field(name, |a| a.allocated())
    }

    fn account_field(
        &self,
        name: &str,
        f: impl FnOnce(&crate::resources::Account) -> ResourceVector,
    ) -> Result<ResourceVector, AllocError> {
        let st = self.lock();
        st.ledger
            .account(name)
            .map(f)
            .ok_or_else(|| AllocError::UnknownConsumer {
                consumer: name.into(),
            })
    }

    /// Current available pool.
    pub fn available(&self) -> ResourceVector {
        self.lock().ledger.available()
    }

    /// Owned copy of the whole ledger, taken under the lock.
    pub fn snapshot(&self) -> Ledger {
        self.lock().ledger.clone()
    }

    /// Runs the safety oracle on the current ledger.
    pub fn is_safe(&self) -> bool {
        oracle::is_safe(&self.lock().ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, EventStream, Payload};

    fn v(a: u32, b: u32, c: u32) -> ResourceVector {
        ResourceVector::new(a, b, c)
    }

    /// Scenario setup: total {10,10,2}, A max {6,4,1}, B max {4,6,1}.
    fn scenario() -> (Allocator, EventStream) {
        let (bus, mut stream) = Bus::channel();
        let alloc = Allocator::with_total(v(10, 10, 2), bus);
        alloc.register("A", v(6, 4, 1)).unwrap();
        alloc.register("B", v(4, 6, 1)).unwrap();
        stream.drain();
        (alloc, stream)
    }

    #[test]
    fn test_register_emits_init_and_rejects_duplicates() {
        let (bus, mut stream) = Bus::channel();
        let alloc = Allocator::with_total(v(10, 10, 2), bus);
        alloc.register("A", v(6, 4, 1)).unwrap();

        let events = stream.drain();
        let init = events
            .iter()
            .find(|e| e.kind == EventKind::HospitalInit)
            .expect("init event");
        assert_eq!(init.subject.as_deref(), Some("A"));
        assert_eq!(
            init.payload,
            Payload::Init {
                max: v(6, 4, 1),
                allocated: ResourceVector::ZERO
            }
        );

        let before = alloc.snapshot();
        assert!(matches!(
            alloc.register("A", v(1, 1, 1)),
            Err(AllocError::AlreadyRegistered { .. })
        ));
        assert_eq!(alloc.snapshot(), before);
    }

    #[test]
    fn test_scenario_grant_then_oracle_decides() {
        let (alloc, mut stream) = scenario();

        assert_eq!(alloc.request("A", v(4, 2, 0)), Ok(Grant::Safe));
        assert_eq!(alloc.available(), v(6, 8, 2));
        assert!(alloc.is_safe());
        stream.drain();

        // B asks for its whole max: available {2,2,1}; A needs {2,2,1} → A finishes,
        // then B needs nothing. A finishing order exists, so it is granted.
        let before = alloc.snapshot();
        let res = alloc.request("B", v(4, 6, 1));
        assert_eq!(res, Ok(Grant::Safe));
        assert!(alloc.is_safe());
        assert_ne!(alloc.snapshot(), before);
        assert_eq!(alloc.available(), v(2, 2, 1));
        assert!(alloc.snapshot().check_invariants().is_ok());
    }

    #[test]
    fn test_released_grant_restores_previous_ledger() {
        let (alloc, _stream) = scenario();
        alloc.request("A", v(4, 2, 0)).unwrap();
        alloc.request("B", v(0, 0, 1)).unwrap();

        let before = alloc.snapshot();
        assert_eq!(alloc.request("A", v(0, 0, 1)), Ok(Grant::Safe));
        alloc.release("A", v(0, 0, 1)).unwrap();
        assert_eq!(alloc.snapshot().available(), before.available());
        assert_eq!(alloc.need("A").unwrap(), v(2, 2, 1));

        alloc.release_all("A").unwrap();
        alloc.release_all("B").unwrap();
        assert_eq!(alloc.available(), v(10, 10, 2));
    }

    #[test]
    fn test_denied_request_leaves_ledger_bit_identical() {
        // Total V:10. A max 8, B max 8. A holds 4, B holds 2 → available 4.
        // B asking 3 leaves available 1: A needs 4, B needs 3 → nobody can finish.
        let (bus, mut stream) = Bus::channel();
        let alloc = Allocator::with_total(v(10, 0, 0), bus);
        alloc.register("A", v(8, 0, 0)).unwrap();
        alloc.register("B", v(8, 0, 0)).unwrap();
        alloc.request("A", v(4, 0, 0)).unwrap();
        alloc.request("B", v(2, 0, 0)).unwrap();
        stream.drain();

        let before = alloc.snapshot();
        let res = alloc.request("B", v(3, 0, 0));
        assert!(matches!(res, Err(AllocError::Unsafe { .. })));
        assert_eq!(alloc.snapshot(), before);

        // The provisional state was unsafe.
        let mut provisional = before.clone();
        let idx = provisional.position("B").unwrap();
        provisional.apply_grant(idx, v(3, 0, 0));
        assert!(!oracle::is_safe(&provisional));

        let events = stream.drain();
        assert!(events.iter().any(|e| e.kind == EventKind::Log
            && e.log_level() == Some(LogLevel::Warn)
            && e.text().is_some_and(|t| t.contains("[UNSAFE]"))));
        assert!(events
            .iter()
            .any(|e| e.kind == EventKind::Status && e.text() == Some(STATUS_DENIED)));
        assert!(!events.iter().any(|e| e.kind == EventKind::HospitalUpdate));
    }

    #[test]
    fn test_unavailable_is_rejected_without_change() {
        let (alloc, mut stream) = scenario();
        alloc.request("A", v(6, 4, 1)).unwrap();
        alloc.trigger_supply_crash();
        assert_eq!(alloc.available(), v(2, 3, 0));
        stream.drain();

        let before = alloc.snapshot();
        let res = alloc.request("B", v(4, 6, 1));
        assert!(matches!(res, Err(AllocError::Unavailable { .. })));
        assert!(res.unwrap_err().is_retryable());
        assert_eq!(alloc.snapshot(), before);

        let events = stream.drain();
        assert!(events
            .iter()
            .any(|e| e.kind == EventKind::Status && e.text() == Some(STATUS_WAITING)));
    }

    #[test]
    fn test_preconditions_are_rejected_without_change() {
        let (alloc, mut stream) = scenario();
        alloc.request("A", v(1, 1, 0)).unwrap();
        stream.drain();
        let before = alloc.snapshot();

        assert!(matches!(
            alloc.request("A", v(6, 0, 0)),
            Err(AllocError::ExceedsNeed { .. })
        ));
        assert!(matches!(
            alloc.request("A", ResourceVector::ZERO),
            Err(AllocError::EmptyRequest { .. })
        ));
        assert!(matches!(
            alloc.request("Z", v(1, 0, 0)),
            Err(AllocError::UnknownConsumer { .. })
        ));
        assert!(matches!(
            alloc.release("A", v(2, 0, 0)),
            Err(AllocError::ExceedsHeld { .. })
        ));
        assert!(matches!(
            alloc.release("Z", v(0, 0, 0)),
            Err(AllocError::UnknownConsumer { .. })
        ));

        assert_eq!(alloc.snapshot(), before);
        assert!(stream.drain().is_empty());
    }

    #[test]
    fn test_release_all_restores_need_and_pool() {
        let (alloc, _stream) = scenario();
        alloc.request("A", v(4, 2, 0)).unwrap();
        alloc.request("A", v(2, 2, 1)).unwrap();
        assert_eq!(alloc.need("A").unwrap(), ResourceVector::ZERO);

        let before = alloc.available();
        let released = alloc.release_all("A").unwrap();
        assert_eq!(released, v(6, 4, 1));
        assert_eq!(alloc.need("A").unwrap(), v(6, 4, 1));
        assert_eq!(alloc.allocated("A").unwrap(), ResourceVector::ZERO);
        assert_eq!(alloc.available(), before + released);
    }

    #[test]
    fn test_safety_off_grants_and_tags_risky() {
        let (bus, mut stream) = Bus::channel();
        let alloc = Allocator::with_total(v(10, 0, 0), bus);
        alloc.register("A", v(8, 0, 0)).unwrap();
        alloc.register("B", v(8, 0, 0)).unwrap();
        alloc.request("A", v(4, 0, 0)).unwrap();
        alloc.request("B", v(2, 0, 0)).unwrap();

        alloc.set_safety(false);
        assert!(!alloc.safety_enabled());
        stream.drain();

        assert_eq!(alloc.request("B", v(3, 0, 0)), Ok(Grant::Risky));
        assert!(!alloc.is_safe());
        assert!(alloc.snapshot().check_invariants().is_ok());

        let events = stream.drain();
        let risky: Vec<_> = events.iter().filter(|e| e.is_risky()).collect();
        assert_eq!(risky.len(), 1);
        assert!(events.iter().any(|e| e.kind == EventKind::HospitalUpdate));
    }

    #[test]
    fn test_safe_grant_is_not_tagged_risky() {
        let (alloc, mut stream) = scenario();
        alloc.request("A", v(1, 0, 0)).unwrap();
        assert!(!stream.drain().iter().any(Event::is_risky));
    }

    #[test]
    fn test_toggle_safety_leaves_ledger_unchanged() {
        let (alloc, _stream) = scenario();
        alloc.request("A", v(2, 2, 0)).unwrap();
        let before = alloc.snapshot();
        alloc.set_safety(false);
        alloc.set_safety(true);
        assert!(alloc.safety_enabled());
        assert_eq!(alloc.snapshot(), before);
    }

    #[test]
    fn test_supply_crash_halves_available_only() {
        let (bus, mut stream) = Bus::channel();
        let alloc = Allocator::with_total(v(30, 30, 6), bus);
        alloc.register("A", v(10, 10, 2)).unwrap();
        alloc.request("A", v(10, 10, 2)).unwrap();
        assert_eq!(alloc.available(), v(20, 20, 4));
        stream.drain();

        let lost = alloc.trigger_supply_crash();
        assert_eq!(lost, v(10, 10, 2));
        assert_eq!(alloc.available(), v(10, 10, 2));
        assert_eq!(alloc.allocated("A").unwrap(), v(10, 10, 2));

        let snap = alloc.snapshot();
        assert_eq!(snap.total(), v(30, 30, 6));
        assert_eq!(snap.written_off(), v(10, 10, 2));
        assert!(snap.check_invariants().is_ok());

        let events = stream.drain();
        assert!(events
            .iter()
            .any(|e| e.payload == Payload::Available(v(10, 10, 2))));
    }

    #[test]
    fn test_demand_surge_raises_max_and_need_equally() {
        let (alloc, mut stream) = scenario();
        alloc.request("A", v(2, 1, 0)).unwrap();
        let before = alloc.snapshot();
        stream.drain();

        let delta = alloc.trigger_demand_surge().unwrap();
        assert!(delta.iter().all(|(_, q)| q >= 1));

        let after = alloc.snapshot();
        for (old, new) in before.accounts().iter().zip(after.accounts()) {
            assert_eq!(new.max(), old.max() + delta);
            assert_eq!(new.need(), old.need() + delta);
            assert_eq!(new.allocated(), old.allocated());
            assert_eq!(new.need(), new.max() - new.allocated());
        }
        assert_eq!(after.available(), before.available());

        let inits = stream
            .drain()
            .into_iter()
            .filter(|e| e.kind == EventKind::HospitalInit)
            .count();
        assert_eq!(inits, 2);
    }

    #[test]
    fn test_no_resources_lost_over_request_release_pairs() {
        let (alloc, _stream) = scenario();
        let total = alloc.snapshot().total();
        let steps = [
            ("A", v(1, 1, 0)),
            ("B", v(2, 3, 1)),
            ("A", v(3, 1, 1)),
            ("B", v(1, 1, 0)),
        ];
        for (name, amount) in steps {
            let _ = alloc.request(name, amount);
            let snap = alloc.snapshot();
            assert_eq!(snap.available() + snap.allocated_total(), total);
        }
        for name in ["A", "B"] {
            alloc.release_all(name).unwrap();
            let snap = alloc.snapshot();
            assert_eq!(snap.available() + snap.allocated_total(), total);
        }
        assert_eq!(alloc.available(), total);
    }

    #[test]
    fn test_demand_surge_rejects_non_positive_delta() {
        let (alloc, mut stream) = scenario();
        let before = alloc.snapshot();
        stream.drain();

        for delta in [ResourceVector::ZERO, v(2, 0, 1)] {
            assert_eq!(
                alloc.trigger_demand_surge_by(delta),
                Err(AllocError::NonPositiveSurge { delta })
            );
        }
        assert_eq!(alloc.snapshot(), before);
        assert!(stream.drain().is_empty());
    }

    #[test]
    fn test_demand_surge_overflow_leaves_every_account_unchanged() {
        let (bus, mut stream) = Bus::channel();
        let alloc = Allocator::with_total(v(10, 10, 2), bus);
        alloc.register("A", v(1, 1, 1)).unwrap();
        alloc.register("B", v(u32::MAX - 1, 1, 1)).unwrap();
        let before = alloc.snapshot();
        stream.drain();

        let err = alloc.trigger_demand_surge_by(v(2, 2, 2)).unwrap_err();
        assert_eq!(err.as_label(), "alloc_surge_overflow");
        assert_eq!(err.consumer(), Some("B"));
        assert_eq!(alloc.snapshot(), before);
        assert!(stream.drain().is_empty());

        alloc.trigger_demand_surge_by(v(1, 2, 2)).unwrap();
        assert_eq!(alloc.need("A").unwrap(), v(2, 3, 3));
        assert_eq!(alloc.need("B").unwrap(), v(u32::MAX, 3, 3));
    }

    #[test]
    fn test_parallel_callers_keep_ledger_safe() {
        use rand::Rng;

        const THREADS: usize = 8;
        const ROUNDS: usize = 2_000;

        let (bus, _stream) = Bus::channel();
        let alloc = Arc::new(Allocator::with_total(v(40, 40, 8), bus));
        for i in 0..THREADS {
            alloc.register(&format!("H{i}"), v(15, 15, 3)).unwrap();
        }

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let alloc = Arc::clone(&alloc);
                std::thread::spawn(move || {
                    let name = format!("H{i}");
                    let mut rng = rand::rng();
                    let mut grants = 0usize;
                    for _ in 0..ROUNDS {
                        let need = alloc.need(&name).unwrap();
                        if need.is_zero() || rng.random_bool(0.2) {
                            alloc.release_all(&name).unwrap();
                        } else {
                            let amount = need.map(|q| rng.random_range(0..=q));
                            match alloc.request(&name, amount) {
                                Ok(grant) => {
                                    assert_eq!(grant, Grant::Safe);
                                    grants += 1;
                                }
                                Err(e) => assert!(
                                    e.is_retryable() || matches!(e, AllocError::EmptyRequest { .. }),
                                    "unexpected refusal: {e}"
                                ),
                            }
                        }
                        let snap = alloc.snapshot();
                        assert!(snap.check_invariants().is_ok());
                        assert!(oracle::is_safe(&snap));
                    }
                    grants
                })
            })
            .collect();

        let grants: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!(grants > 0);

        for i in 0..THREADS {
            alloc.release_all(&format!("H{i}")).unwrap();
        }
        assert_eq!(alloc.available(), v(40, 40, 8));
    }
}
