// src/exec/supervisor.rs

//! Child process supervision.
//!
//! [`ProcessSupervisor::spawn`] starts the child with both output streams
//! piped and a pump on each. The returned [`SupervisedRun`] owns the child
//! and the pump tasks; nothing else touches those streams.
//!
//! Exit and drain are observed separately: [`SupervisedRun::wait`] resolves
//! when the child exits (or the token fires and the tree has been killed),
//! [`SupervisedRun::drain`] resolves when both pumps have finished. A child
//! can exit while its last chunks are still being delivered, so callers must
//! await both, and both honour the token.

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, timeout, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{RcopyError, Result};
use crate::exec::command::RunRequest;
#[cfg(not(windows))]
use crate::exec::command::argv_token;
use crate::exec::observer::RunObserver;
use crate::exec::pump::{PumpReport, spawn_pump};
use crate::exec::terminate::{KillSwitch, SystemTreeKiller, TreeKiller};
use crate::types::{RunOutcome, StreamKind};

/// How long pumps (and the killed child) get to wind down after a cancel.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Clone)]
pub struct ProcessSupervisor {
    killer: Arc<dyn TreeKiller>,
    drain_timeout: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(Arc::new(SystemTreeKiller), DEFAULT_DRAIN_TIMEOUT)
    }
}

impl ProcessSupervisor {
    pub fn new(killer: Arc<dyn TreeKiller>, drain_timeout: Duration) -> Self {
        Self {
            killer,
            drain_timeout,
        }
    }

    /// Start the child described by `request` and attach both pumps.
    ///
    /// Fails with [`RcopyError::Launch`] when the OS cannot create the
    /// process; no pump is started and `observer` is never called.
    pub fn spawn(
        &self,
        request: &RunRequest,
        observer: Arc<dyn RunObserver>,
    ) -> Result<SupervisedRun> {
        let mut cmd = build_command(request);

        let mut child = cmd.spawn().map_err(|source| RcopyError::Launch {
            program: request.program().to_string(),
            source,
        })?;

        let pid = child.id();
        info!(program = %request.program(), pid = ?pid, "child process started");

        let stdout = child
            .stdout
            .take()
            .map(|s| spawn_pump(StreamKind::Stdout, s, Arc::clone(&observer)));
        let stderr = child
            .stderr
            .take()
            .map(|s| spawn_pump(StreamKind::Stderr, s, Arc::clone(&observer)));

        Ok(SupervisedRun {
            child,
            program: request.program().to_string(),
            kill: Arc::new(KillSwitch::new(pid, Arc::clone(&self.killer))),
            pumps: [stdout, stderr].into_iter().flatten().collect(),
            drain_timeout: self.drain_timeout,
        })
    }
}

fn build_command(request: &RunRequest) -> Command {
    let mut cmd = Command::new(request.program());

    // Windows receives the single command line untouched; elsewhere each
    // token becomes one argv entry with its quotes removed.
    #[cfg(windows)]
    {
        cmd.raw_arg(request.command_line());
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(windows))]
    {
        cmd.args(request.args().iter().map(|arg| argv_token(arg)));
    }

    if let Some(dir) = request.working_dir() {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so the whole subtree can be signalled at once.
    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

/// A started child plus its two pumps.
pub struct SupervisedRun {
    child: Child,
    program: String,
    kill: Arc<KillSwitch>,
    pumps: Vec<JoinHandle<PumpReport>>,
    drain_timeout: Duration,
}

/// What [`SupervisedRun::drain`] collected.
#[derive(Debug)]
pub struct Drained {
    pub reports: Vec<PumpReport>,
    /// The subtree kill was issued, either while waiting or while draining.
    pub killed: bool,
}

impl SupervisedRun {
    /// Pid recorded at spawn time; still available after the child is reaped.
    pub fn pid(&self) -> Option<u32> {
        self.kill.pid()
    }

    /// Wait for the child to exit, or for `cancel` to fire.
    ///
    /// If the token is already cancelled, cancellation wins even when the
    /// child has exited too.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> RunOutcome {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!(program = %self.program, "cancellation requested; killing process tree");
                self.terminate().await;
                RunOutcome::Cancelled
            }

            status = self.child.wait() => {
                let code = match status {
                    Ok(status) => exit_code(status),
                    Err(e) => {
                        warn!(program = %self.program, error = %e, "failed to wait for child");
                        -1
                    }
                };
                info!(program = %self.program, exit_code = code, "child process exited");
                RunOutcome::Exited(code)
            }
        }
    }

    /// Issue the subtree kill off the async workers (the process table walk
    /// blocks). Only the first call does anything.
    async fn fire_kill(&self) {
        let kill = Arc::clone(&self.kill);
        if let Err(e) = tokio::task::spawn_blocking(move || kill.trigger()).await {
            warn!(program = %self.program, error = %e, "kill task failed");
        }
    }

    async fn terminate(&mut self) {
        self.fire_kill().await;

        // Reap the root; the group kill normally makes this immediate.
        match timeout(self.drain_timeout, self.child.wait()).await {
            Ok(Ok(status)) => debug!(exit_code = ?status.code(), "killed child reaped"),
            Ok(Err(e)) => debug!(error = %e, "waiting for killed child failed"),
            Err(_) => {
                warn!(program = %self.program, "child still alive after kill; forcing");
                if let Err(e) = self.child.start_kill() {
                    debug!(error = %e, "forced kill failed");
                }
            }
        }
    }

    /// Wait for both pumps to finish.
    ///
    /// Without a kill the pumps get as long as they need, but `cancel` is
    /// still watched: a descendant that outlives the child keeps the pipes
    /// open, and cancelling then kills the rest of the process group.
    /// After a kill the wait is bounded by the drain timeout; pumps still
    /// running then are aborted and awaited, so no callback fires after this
    /// returns.
    pub async fn drain(mut self, cancel: &CancellationToken) -> Drained {
        let mut pumps: VecDeque<_> = std::mem::take(&mut self.pumps).into();
        let mut reports = Vec::with_capacity(pumps.len());

        if !self.kill.is_fired() {
            while let Some(pump) = pumps.front_mut() {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        info!(program = %self.program, "cancellation requested while draining; killing process tree");
                        self.fire_kill().await;
                        break;
                    }

                    joined = pump => {
                        record(&mut reports, joined);
                        pumps.pop_front();
                    }
                }
            }
        }

        let deadline = Instant::now() + self.drain_timeout;
        for mut pump in pumps {
            match timeout_at(deadline, &mut pump).await {
                Ok(joined) => record(&mut reports, joined),
                Err(_) => {
                    warn!(program = %self.program, "pump still running after kill; abandoning it");
                    pump.abort();
                    let _ = pump.await;
                }
            }
        }

        Drained {
            reports,
            killed: self.kill.is_fired(),
        }
    }
}

fn record(reports: &mut Vec<PumpReport>, joined: std::result::Result<PumpReport, JoinError>) {
    match joined {
        Ok(report) => reports.push(report),
        Err(e) => debug!(error = %e, "pump task failed"),
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            debug!(signal, "child terminated by signal");
        }
    }
    status.code().unwrap_or(-1)
}
