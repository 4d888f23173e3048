//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes when the process is asked to stop.
//!
//! - Unix: `SIGINT`, `SIGTERM`, `SIGQUIT` (and Ctrl-C)
//! - elsewhere: Ctrl-C via [`tokio::signal::ctrl_c`]

use std::fmt;

/// Which signal stopped the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl-C or `SIGINT`.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGQUIT`.
    Quit,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownSignal::Interrupt => "interrupt",
            ShutdownSignal::Terminate => "terminate",
            ShutdownSignal::Quit => "quit",
        })
    }
}

/// Waits for a termination signal.
///
/// Each call installs its own listeners; fails only if that installation fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let got = tokio::select! {
        _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
        _ = sigint.recv()  => ShutdownSignal::Interrupt,
        _ = sigterm.recv() => ShutdownSignal::Terminate,
        _ = sigquit.recv() => ShutdownSignal::Quit,
    };
    Ok(got)
}

/// Waits for a termination signal.
///
/// Each call installs its own listener; fails only if that installation fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}
