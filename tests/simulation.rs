use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use safevax::{
    Board, Config, DriverPolicy, Event, EventKind, ResourceVector, RuntimeError, ScriptedPolicy,
    Simulation, Subscribe,
};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.events.lock().push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

fn v(a: u32, b: u32, c: u32) -> ResourceVector {
    ResourceVector::new(a, b, c)
}

fn hospitals() -> Vec<(&'static str, ResourceVector)> {
    vec![
        ("Hospital-1", v(25, 20, 5)),
        ("Hospital-2", v(20, 25, 4)),
        ("Hospital-3", v(18, 15, 3)),
    ]
}

fn paced() -> Arc<dyn DriverPolicy> {
    Arc::new(
        ScriptedPolicy::new([])
            .with_think(Duration::from_millis(50))
            .with_treat(Duration::from_millis(200)),
    )
}

#[tokio::test(start_paused = true)]
async fn simulation_keeps_invariants_and_delivers_every_event_in_order() {
    let recorder = Arc::new(Recorder::default());
    let board = Arc::new(Board::new(20));

    let sim = Simulation::builder(Config::default())
        .with_hospitals(hospitals())
        .with_policy(paced())
        .with_subscribers(vec![
            recorder.clone() as Arc<dyn Subscribe>,
            board.clone() as Arc<dyn Subscribe>,
        ])
        .build();

    let runner = Arc::clone(&sim);
    let run = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_secs(5)).await;
    sim.shutdown();
    run.await.unwrap().unwrap();

    let ledger = sim.allocator().snapshot();
    assert!(ledger.check_invariants().is_ok());
    assert_eq!(ledger.len(), 3);
    assert!(sim.allocator().is_safe());

    let events = recorder.events.lock().clone();
    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    let expected: Vec<u64> = (1..=events.len() as u64).collect();
    assert_eq!(seqs, expected);

    let inits = events
        .iter()
        .filter(|e| e.kind == EventKind::HospitalInit)
        .count();
    assert_eq!(inits, 3);
    assert!(events.iter().any(|e| e.text() == Some("Treating Patients (Busy)")));
    assert!(!events.iter().any(Event::is_risky));

    let st = board.snapshot().await;
    assert_eq!(st.last_seq, events.len() as u64);
    assert_eq!(st.available, ledger.available());
    for acct in ledger.accounts() {
        let row = st.row(acct.name()).unwrap();
        assert_eq!(row.allocated, acct.allocated());
        assert_eq!(row.max, acct.max());
    }
}

#[tokio::test(start_paused = true)]
async fn safety_off_grants_are_tagged_risky() {
    let recorder = Arc::new(Recorder::default());
    let cfg = Config {
        safety: false,
        ..Config::default()
    };
    let sim = Simulation::builder(cfg)
        .with_hospitals(hospitals())
        .with_policy(paced())
        .with_subscriber(recorder.clone())
        .build();

    let runner = Arc::clone(&sim);
    let run = tokio::spawn(async move { runner.run().await });
    tokio::time::sleep(Duration::from_secs(2)).await;
    sim.shutdown();
    run.await.unwrap().unwrap();

    let events = recorder.events.lock().clone();
    assert!(events.iter().any(Event::is_risky));
    assert!(!events
        .iter()
        .any(|e| e.text().is_some_and(|t| t.starts_with("[GRANTED]"))));
    assert!(sim.allocator().snapshot().check_invariants().is_ok());
}

#[tokio::test(start_paused = true)]
async fn admin_shocks_during_run_keep_the_ledger_consistent() {
    let sim = Simulation::builder(Config::default())
        .with_hospitals(hospitals())
        .with_policy(paced())
        .build();

    let runner = Arc::clone(&sim);
    let run = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    let before = sim.allocator().snapshot();
    let lost = sim.allocator().trigger_supply_crash();
    assert_eq!(sim.allocator().snapshot().written_off(), lost);
    assert_eq!(sim.allocator().available() + lost, before.available());

    sim.allocator().trigger_demand_surge_by(v(2, 2, 1)).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    sim.shutdown();
    run.await.unwrap().unwrap();

    let after = sim.allocator().snapshot();
    assert!(after.check_invariants().is_ok());
    for (old, new) in before.accounts().iter().zip(after.accounts()) {
        assert_eq!(new.max(), old.max() + v(2, 2, 1));
    }
}

#[tokio::test]
async fn run_twice_is_rejected() {
    let sim = Simulation::builder(Config::default())
        .with_hospitals(hospitals())
        .with_policy(paced())
        .build();

    sim.shutdown();
    sim.run().await.unwrap();
    assert!(matches!(sim.run().await, Err(RuntimeError::AlreadyStarted)));
}

/// Blocks the calling thread on its first request.
struct Stubborn {
    blocked: AtomicBool,
}

impl DriverPolicy for Stubborn {
    fn think_delay(&self) -> Duration {
        Duration::ZERO
    }

    fn choose_request(&self, need: ResourceVector) -> ResourceVector {
        if !self.blocked.swap(true, Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(500));
        }
        need
    }

    fn treat_duration(&self) -> Duration {
        Duration::ZERO
    }

    fn denied_backoff(&self, _refusals: u32) -> Duration {
        Duration::ZERO
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn grace_exceeded_names_stuck_drivers() {
    let cfg = Config {
        grace: Duration::from_millis(50),
        ..Config::default()
    };
    let sim = Simulation::builder(cfg)
        .with_hospitals([("Hospital-1", v(5, 5, 1))])
        .with_policy(Arc::new(Stubborn {
            blocked: AtomicBool::new(false),
        }))
        .build();

    let stopper = Arc::clone(&sim);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stopper.shutdown();
    });

    match sim.run().await {
        Err(RuntimeError::GraceExceeded { stuck, .. }) => {
            assert_eq!(stuck, vec!["Hospital-1".to_string()]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_hospitals_waits_for_shutdown() {
    let cfg = Config {
        hospitals: 0,
        ..Config::default()
    };
    let sim = Simulation::builder(cfg).build();
    assert!(sim.hospitals().is_empty());

    let runner = Arc::clone(&sim);
    let run = tokio::spawn(async move { runner.run().await });
    tokio::task::yield_now().await;
    assert!(!run.is_finished());

    sim.allocator().register("Manual", v(1, 1, 1)).unwrap();
    assert!(sim.allocator().request("Manual", v(1, 1, 1)).is_ok());

    sim.shutdown();
    run.await.unwrap().unwrap();
}
