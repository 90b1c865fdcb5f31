//! Running `ExternalCommand`s.
//!
//! Two variants share one command abstraction:
//! - blocking: `run_blocking` / `run_sequence` wait for each child with
//!   inherited streams, so output appears in order.
//! - background: `launch` spawns every command at once and supervises the
//!   set until all children exit. Cancelling the caller's `Shutdown` sends
//!   SIGTERM to every child still running. A child that outlives the grace
//!   period, or every child once `Shutdown::force` is called, gets SIGKILL.
//!
//! Only the direct child is signalled. Processes the child started itself
//! (e.g. the dev server under `pnpm`) are not tracked here and may outlive a
//! cancelled run if the child does not forward the signal.

use crate::command::ExternalCommand;
use crate::error::{OrmsError, Result};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Blocking
// ---------------------------------------------------------------------------

/// Run one command to completion. A non-zero exit is `CommandFailed`.
pub fn run_blocking(cmd: &ExternalCommand) -> Result<()> {
    let program = resolve_program(cmd)?;
    tracing::info!(step = %cmd.label, command = %cmd, "running");

    let mut command = std::process::Command::new(program);
    command
        .args(&cmd.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(dir) = &cmd.cwd {
        command.current_dir(dir);
    }

    let status = command.status().map_err(|source| OrmsError::SpawnFailed {
        program: cmd.program.clone(),
        source,
    })?;
    check_status(cmd, status)
}

/// Run steps in order, stopping at the first failure.
pub fn run_sequence(steps: &[ExternalCommand]) -> Result<()> {
    for step in steps {
        run_blocking(step)?;
    }
    Ok(())
}

fn check_status(cmd: &ExternalCommand, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    tracing::debug!(step = %cmd.label, ?status, "step failed");
    Err(OrmsError::CommandFailed {
        command: cmd.command_line(),
        code: status.code(),
    })
}

/// Look the program up on `PATH` (bare names only) and check the working
/// directory, so a missing tool or package is reported before spawning.
fn resolve_program(cmd: &ExternalCommand) -> Result<PathBuf> {
    if let Some(dir) = &cmd.cwd {
        if !dir.is_dir() {
            return Err(OrmsError::MissingDirectory(dir.clone()));
        }
    }
    if cmd.program.contains(std::path::MAIN_SEPARATOR) {
        return Ok(PathBuf::from(&cmd.program));
    }
    which::which(&cmd.program).map_err(|_| OrmsError::ToolNotFound(cmd.program.clone()))
}

// ---------------------------------------------------------------------------
// Background
// ---------------------------------------------------------------------------

/// A spawned background child, owned by the supervisor until it is reaped.
#[derive(Debug)]
pub struct ChildHandle {
    label: String,
    child: tokio::process::Child,
}

impl ChildHandle {
    /// Spawn without waiting. Must be called inside a tokio runtime.
    pub fn spawn(cmd: &ExternalCommand) -> Result<Self> {
        let program = resolve_program(cmd)?;
        let mut command = tokio::process::Command::new(program);
        command
            .args(&cmd.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| OrmsError::SpawnFailed {
            program: cmd.program.clone(),
            source,
        })?;
        tracing::info!(step = %cmd.label, pid = ?child.id(), command = %cmd, "spawned");

        Ok(Self {
            label: cmd.label.clone(),
            child,
        })
    }

    /// Ask the child to exit (SIGTERM on unix). Best-effort.
    pub fn terminate(&mut self) {
        let Some(pid) = self.child.id() else {
            return;
        };
        tracing::info!(step = %self.label, pid, "sending SIGTERM");

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                tracing::warn!(step = %self.label, error = %e, "failed to send SIGTERM");
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = self.child.start_kill() {
                tracing::warn!(step = %self.label, error = %e, "failed to kill process");
            }
        }
    }

    /// Wait for exit, terminating the child first if `shutdown` is cancelled.
    async fn watch(mut self, shutdown: Shutdown) -> ChildExit {
        let status = tokio::select! {
            res = self.child.wait() => res,
            () = shutdown.stop.cancelled() => {
                self.terminate();
                self.wait_or_kill(&shutdown).await
            }
        };

        match status {
            Ok(status) => {
                tracing::info!(step = %self.label, %status, "exited");
                ChildExit {
                    label: self.label,
                    status: Some(status),
                }
            }
            Err(e) => {
                tracing::warn!(step = %self.label, error = %e, "wait failed");
                ChildExit {
                    label: self.label,
                    status: None,
                }
            }
        }
    }

    /// After SIGTERM: wait up to the grace period, or until forced, then kill.
    async fn wait_or_kill(&mut self, shutdown: &Shutdown) -> std::io::Result<ExitStatus> {
        tokio::select! {
            res = self.child.wait() => return res,
            _ = tokio::time::sleep(shutdown.grace) => {
                tracing::warn!(step = %self.label, grace = ?shutdown.grace, "did not exit after SIGTERM, sending SIGKILL");
            }
            () = shutdown.force.cancelled() => {
                tracing::warn!(step = %self.label, "forced stop, sending SIGKILL");
            }
        }
        if let Err(e) = self.child.kill().await {
            tracing::warn!(step = %self.label, error = %e, "failed to kill process");
        }
        self.child.wait().await
    }
}

/// Outcome of one supervised child.
#[derive(Debug)]
pub struct ChildExit {
    pub label: String,
    /// `None` when waiting on the child failed.
    pub status: Option<ExitStatus>,
}

impl ChildExit {
    pub fn success(&self) -> bool {
        self.status.is_some_and(|s| s.success())
    }

    /// The signal that ended the child, if any.
    #[cfg(unix)]
    pub fn signal(&self) -> Option<i32> {
        use std::os::unix::process::ExitStatusExt;
        self.status.and_then(|s| s.signal())
    }
}

/// Grace period between SIGTERM and SIGKILL when none is configured.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Stop request shared by the supervisor and whoever decides to stop it.
///
/// `stop` sends SIGTERM to every running child; children still alive after
/// `grace` are killed. `force` kills them without waiting out the grace period.
#[derive(Debug, Clone)]
pub struct Shutdown {
    stop: CancellationToken,
    force: CancellationToken,
    grace: Duration,
}

impl Shutdown {
    pub fn new(grace: Duration) -> Self {
        Self {
            stop: CancellationToken::new(),
            force: CancellationToken::new(),
            grace,
        }
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn force(&self) {
        self.stop.cancel();
        self.force.cancel();
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

/// Wait on every child concurrently. Resolves once all have exited.
pub async fn supervise(children: Vec<ChildHandle>, shutdown: &Shutdown) -> Vec<ChildExit> {
    let waits = children
        .into_iter()
        .map(|child| child.watch(shutdown.clone()));
    futures::future::join_all(waits).await
}

/// Spawn every command without waiting between them, then supervise the set.
///
/// If a spawn fails, the children already started are terminated and reaped
/// before the error is returned.
pub async fn launch(commands: &[ExternalCommand], shutdown: &Shutdown) -> Result<Vec<ChildExit>> {
    let mut children = Vec::with_capacity(commands.len());
    for cmd in commands {
        match ChildHandle::spawn(cmd) {
            Ok(child) => children.push(child),
            Err(e) => {
                tracing::error!(step = %cmd.label, error = %e, "spawn failed; stopping started services");
                let abort = Shutdown::new(shutdown.grace);
                abort.stop();
                supervise(children, &abort).await;
                return Err(e);
            }
        }
    }
    Ok(supervise(children, shutdown).await)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
