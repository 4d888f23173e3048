//! # Simulation: runs the hospital drivers, the event fan-out and shutdown.
//!
//! The [`Simulation`] owns the bus, the shared [`Allocator`], the subscribers
//! and the runtime cancellation token. [`Simulation::run`] spawns one
//! [`HospitalDriver`] per configured hospital and returns once the run is
//! over.
//!
//! ## High-level architecture
//! ```text
//! SimulationBuilder::build()
//!   ├─ Bus::channel()             → (bus, stream)
//!   ├─ Allocator::new(&cfg, bus)  (publishes the initial GLOBAL)
//!   └─ hospitals: names + max demand drawn from cfg.max_demand
//!
//! run():
//!   listener:  stream.recv() ──► SubscriberSet::emit(ev) ──► worker per subscriber
//!   drivers:   Hospital-1 … Hospital-N
//!                  └──► child token = runtime_token.child_token()
//!                       set.spawn(driver.run(child))
//!
//! Stop path (first of):
//!   - OS signal           ─► cancel runtime_token ─► wait_all_with_grace
//!   - Simulation::shutdown─► (token already cancelled) ─► wait_all_with_grace
//!   - every driver exited ─► Ok
//! then:
//!   listener drains what is left on the stream, subscriber queues are closed
//!   and their workers awaited.
//! ```
//!
//! ## Rules
//! - `run` may be called once; a second call returns `RuntimeError::AlreadyStarted`.
//! - The allocator stays usable (admin surface) while and after the run.
//! - Stopping a driver never releases its holdings.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{
    select,
    task::{JoinError, JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
    allocator::Allocator,
    core::{
        builder::SimulationBuilder,
        config::Config,
        driver::{DriverExit, HospitalDriver},
        shutdown,
    },
    error::RuntimeError,
    events::{Bus, Event, EventStream, LogLevel},
    policies::DriverPolicy,
    resources::ResourceVector,
    subscribers::{Subscribe, SubscriberSet},
};

/// Parts consumed by the first call to `run`.
struct Pending {
    stream: EventStream,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

/// Hospital drivers, event fan-out and graceful shutdown around one allocator.
pub struct Simulation {
    cfg: Config,
    bus: Bus,
    allocator: Arc<Allocator>,
    policy: Arc<dyn DriverPolicy>,
    hospitals: Vec<(Arc<str>, ResourceVector)>,
    pending: Mutex<Option<Pending>>,
    runtime_token: CancellationToken,
}

impl Simulation {
    /// Creates a builder for configuring the simulation.
    pub fn builder(cfg: Config) -> SimulationBuilder {
        SimulationBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        stream: EventStream,
        allocator: Arc<Allocator>,
        policy: Arc<dyn DriverPolicy>,
        hospitals: Vec<(Arc<str>, ResourceVector)>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        Self {
            cfg,
            bus,
            allocator,
            policy,
            hospitals,
            pending: Mutex::new(Some(Pending {
                stream,
                subscribers,
            })),
            runtime_token: CancellationToken::new(),
        }
    }

    /// The shared allocator (admin surface).
    pub fn allocator(&self) -> &Arc<Allocator> {
        &self.allocator
    }

    /// The configuration the simulation was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Hospitals that `run` spawns, with their declared maximum demand.
    pub fn hospitals(&self) -> &[(Arc<str>, ResourceVector)] {
        &self.hospitals
    }

    /// Asks a running simulation to stop; `run` then waits up to the grace period.
    pub fn shutdown(&self) {
        self.runtime_token.cancel();
    }

    /// Runs until every driver exits, an OS signal arrives, or [`shutdown`](Self::shutdown)
    /// is called.
    ///
    /// Returns [`RuntimeError::GraceExceeded`] when drivers outlive the grace period.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let pending = self
            .pending
            .lock()
            .take()
            .ok_or(RuntimeError::AlreadyStarted)?;

        let listener_token = CancellationToken::new();
        let listener = self.subscriber_listener(pending, listener_token.clone());

        let mut set = JoinSet::new();
        let mut running = HashSet::new();
        self.spawn_drivers(&mut set, &mut running);

        let res = self.drive_shutdown(&mut set, &mut running).await;

        listener_token.cancel();
        if let Err(e) = listener.await {
            tracing::error!(error = %e, "event listener failed");
        }
        res
    }

    /// Drains the bus into the subscriber set until `token` fires, then flushes.
    fn subscriber_listener(&self, pending: Pending, token: CancellationToken) -> JoinHandle<()> {
        let Pending {
            mut stream,
            subscribers,
        } = pending;
        let capacity = self.cfg.subscriber_capacity_clamped();

        tokio::spawn(async move {
            let subs = SubscriberSet::new(subscribers, capacity);
            loop {
                select! {
                    biased;
                    ev = stream.recv() => match ev {
                        Some(ev) => subs.emit(ev).await,
                        None => break,
                    },
                    _ = token.cancelled() => {
                        for ev in stream.drain() {
                            subs.emit(ev).await;
                        }
                        break;
                    }
                }
            }
            subs.shutdown().await;
        })
    }

    fn spawn_drivers(&self, set: &mut JoinSet<Exited>, running: &mut HashSet<Arc<str>>) {
        for (name, max) in &self.hospitals {
            let driver = HospitalDriver::new(
                Arc::clone(name),
                *max,
                Arc::clone(&self.allocator),
                self.bus.clone(),
                Arc::clone(&self.policy),
            );
            let child = self.runtime_token.child_token();
            let tag = Arc::clone(name);
            set.spawn(async move { (tag, driver.run(child).await) });
            running.insert(Arc::clone(name));
        }
    }

    async fn drive_shutdown(
        &self,
        set: &mut JoinSet<Exited>,
        running: &mut HashSet<Arc<str>>,
    ) -> Result<(), RuntimeError> {
        let idle = set.is_empty();
        select! {
            sig = shutdown::wait_for_shutdown_signal() => {
                match sig {
                    Ok(sig) => {
                        tracing::info!(signal = %sig, "shutdown requested");
                        self.bus.publish(Event::log(
                            LogLevel::Info,
                            format!("[SYSTEM] Shutdown requested ({sig})"),
                        ));
                        self.runtime_token.cancel();
                        self.wait_all_with_grace(set, running).await
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "signal listeners unavailable; stopping");
                        self.runtime_token.cancel();
                        self.wait_all_with_grace(set, running).await?;
                        Err(RuntimeError::Signal(e))
                    }
                }
            }
            _ = self.runtime_token.cancelled() => {
                self.wait_all_with_grace(set, running).await
            }
            _ = async {
                if idle {
                    std::future::pending::<()>().await;
                }
                while let Some(res) = set.join_next().await {
                    on_driver_exit(res, running);
                }
            } => Ok(()),
        }
    }

    /// Waits for all drivers within the grace period.
    ///
    /// Zero grace aborts the remaining drivers without waiting.
    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<Exited>,
        running: &mut HashSet<Arc<str>>,
    ) -> Result<(), RuntimeError> {
        let Some(grace) = self.cfg.grace_period() else {
            set.abort_all();
            return Ok(());
        };

        let done = async {
            while let Some(res) = set.join_next().await {
                on_driver_exit(res, running);
            }
        };
        if tokio::time::timeout(grace, done).await.is_ok() {
            return Ok(());
        }

        let mut stuck: Vec<String> = running.iter().map(|n| n.to_string()).collect();
        stuck.sort_unstable();
        tracing::warn!(?grace, ?stuck, "drivers did not stop within grace");
        set.abort_all();
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }
}

type Exited = (Arc<str>, DriverExit);

fn on_driver_exit(res: Result<Exited, JoinError>, running: &mut HashSet<Arc<str>>) {
    match res {
        Ok((name, exit)) => {
            running.remove(&name);
            if let DriverExit::Fatal(e) = exit {
                tracing::warn!(hospital = %name, error = %e, "driver exited");
            }
        }
        Err(e) if e.is_panic() => tracing::error!(error = %e, "driver panicked"),
        Err(_) => {}
    }
}
