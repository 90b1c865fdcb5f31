//! `dev all`: every database up in order, then every service in parallel
//! until they exit or the operator interrupts.
//!
//! The first SIGINT/SIGTERM asks every service to stop; a second one kills
//! whatever is still running.

use anyhow::Result;
use orms_core::exec::{self, Shutdown};
use orms_core::ExternalCommand;
use std::time::Duration;

pub fn run(databases: &[ExternalCommand], services: &[ExternalCommand], grace: Duration) -> Result<()> {
    // Phase one: nothing is spawned in the background until every database is up.
    exec::run_sequence(databases)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let shutdown = Shutdown::new(grace);
        // Handlers are installed before the first child is spawned.
        let signals = watch_signals(shutdown.clone())?;

        let result = exec::launch(services, &shutdown).await;

        signals.abort();
        let _ = signals.await;

        let exits = result?;
        for exit in &exits {
            match exit.status {
                Some(status) if exit.success() => {
                    tracing::info!(service = %exit.label, %status, "service exited")
                }
                Some(status) => tracing::warn!(service = %exit.label, %status, "service exited"),
                None => tracing::warn!(service = %exit.label, "service exit status unknown"),
            }
        }
        // Service exit codes do not affect ours: these are long-running dev
        // servers and the expected way out is the cancellation path.
        Ok::<(), anyhow::Error>(())
    })
}

/// First SIGINT or SIGTERM stops `shutdown`, the next one forces it.
#[cfg(unix)]
fn watch_signals(shutdown: Shutdown) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
            };
            if shutdown.is_stopping() {
                tracing::warn!("received {name} again, killing services");
                shutdown.force();
                return;
            }
            tracing::info!(
                grace = ?shutdown.grace(),
                "received {name}, stopping services (repeat to kill)"
            );
            shutdown.stop();
        }
    }))
}

#[cfg(not(unix))]
fn watch_signals(shutdown: Shutdown) -> std::io::Result<tokio::task::JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
            if shutdown.is_stopping() {
                tracing::warn!("received Ctrl-C again, killing services");
                shutdown.force();
                return;
            }
            tracing::info!(grace = ?shutdown.grace(), "received Ctrl-C, stopping services (repeat to kill)");
            shutdown.stop();
        }
    }))
}
