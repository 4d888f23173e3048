//! Operator console: runs the default simulation and reads admin commands
//! from stdin.
//!
//! ```text
//! safe on | safe off     toggle the banker's check
//! crash                  supply crash (available × crash factor)
//! surge [V S T]          demand surge (random or explicit delta)
//! board                  print the current board
//! quit                   stop the drivers and exit
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::sync::Arc;

use anyhow::{Context, bail};
use safevax::{Board, Config, LogWriter, ResourceVector, Simulation, Subscribe};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "commands: safe on|off, crash, surge [V S T], board, help, quit";

enum Command {
    Safety(bool),
    Crash,
    Surge(Option<ResourceVector>),
    Board,
    Help,
    Quit,
}

fn parse(line: &str) -> anyhow::Result<Command> {
    let mut words = line.split_whitespace();
    let cmd = match (words.next(), words.next()) {
        (Some("safe"), Some("on")) => Command::Safety(true),
        (Some("safe"), Some("off")) => Command::Safety(false),
        (Some("crash"), None) => Command::Crash,
        (Some("surge"), None) => Command::Surge(None),
        (Some("surge"), Some(first)) => {
            let rest: Vec<&str> = std::iter::once(first).chain(words.by_ref()).collect();
            let [v, s, t] = *rest.as_slice() else {
                bail!("surge expects three quantities, got {}", rest.len());
            };
            let q = |w: &str| w.parse::<u32>().with_context(|| format!("bad quantity {w:?}"));
            Command::Surge(Some(ResourceVector::new(q(v)?, q(s)?, q(t)?)))
        }
        (Some("board"), None) => Command::Board,
        (Some("help"), None) => Command::Help,
        (Some("quit" | "exit"), None) => Command::Quit,
        _ => bail!("unknown command {line:?}"),
    };
    if words.next().is_some() {
        bail!("trailing input in {line:?}");
    }
    Ok(cmd)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::default();
    let board = Arc::new(Board::new(cfg.log_tail));
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new()), board.clone()];

    let sim = Simulation::builder(cfg).with_subscribers(subs).build();
    for (name, max) in sim.hospitals() {
        tracing::info!(hospital = %name, max = %max, "spawning driver");
    }
    tracing::info!("{HELP}");

    let runner = Arc::clone(&sim);
    let mut run = tokio::spawn(async move { runner.run().await });
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            res = &mut run => {
                res.context("simulation task failed")??;
                return Ok(());
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse(&line) {
                    Ok(Command::Safety(on)) => sim.allocator().set_safety(on),
                    Ok(Command::Crash) => {
                        let lost = sim.allocator().trigger_supply_crash();
                        tracing::info!(lost = %lost, "supply crash");
                    }
                    Ok(Command::Surge(None)) => match sim.allocator().trigger_demand_surge() {
                        Ok(delta) => tracing::info!(delta = %delta, "demand surge"),
                        Err(e) => tracing::warn!(error = %e, "demand surge rejected"),
                    },
                    Ok(Command::Surge(Some(delta))) => {
                        if let Err(e) = sim.allocator().trigger_demand_surge_by(delta) {
                            tracing::warn!(error = %e, "demand surge rejected");
                        }
                    }
                    Ok(Command::Board) => {
                        println!("{}", board.render(10).await);
                        println!(
                            "safety: {}  safe state: {}",
                            if sim.allocator().safety_enabled() { "on" } else { "off" },
                            sim.allocator().is_safe()
                        );
                    }
                    Ok(Command::Help) => println!("{HELP}"),
                    Ok(Command::Quit) => break,
                    Err(e) => tracing::warn!("{e:#}; {HELP}"),
                }
            }
        }
    }

    sim.shutdown();
    run.await.context("simulation task failed")??;
    Ok(())
}
