// src/exec/terminate.rs

//! Subtree termination.
//!
//! Copy tools lean on helper processes, so cancelling a run must take down
//! the child and everything below it. The capability sits behind
//! [`TreeKiller`]; [`SystemTreeKiller`] is the platform implementation:
//!
//! - Unix: the child leads its own process group (see the supervisor), so the
//!   whole group gets `SIGKILL`. Descendants that left the group are found
//!   by walking the parent links and killed one by one.
//! - Elsewhere: the parent-link walk plus a kill of the root.
//!
//! Termination is best-effort. Failures (already exited, permission denied)
//! are logged and swallowed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tracing::{debug, info};

/// "Terminate this process and all of its descendants."
///
/// Implementations may block (the system one scans the process table), so
/// async callers run them on the blocking pool.
pub trait TreeKiller: Send + Sync {
    fn kill_tree(&self, pid: u32);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTreeKiller;

impl TreeKiller for SystemTreeKiller {
    fn kill_tree(&self, pid: u32) {
        // Collect before killing: once the root dies its children are
        // re-parented and the links are gone.
        let descendants = descendants_of(pid);
        debug!(pid, count = descendants.len(), "collected descendants");

        // The root may not lead a group of its own (e.g. a pid that was not
        // spawned by the supervisor), so it is signalled directly as well.
        #[cfg(unix)]
        {
            unix::kill_group(pid);
            unix::kill_pid(pid);
        }
        #[cfg(not(unix))]
        kill_with_sysinfo(pid);

        for child in descendants {
            #[cfg(unix)]
            unix::kill_pid(child);
            #[cfg(not(unix))]
            kill_with_sysinfo(child);
        }
    }
}

#[cfg(unix)]
mod unix {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid as NixPid;
    use tracing::{debug, warn};

    pub(super) fn kill_group(pgid: u32) {
        match signal::killpg(NixPid::from_raw(pgid as i32), Signal::SIGKILL) {
            Ok(()) => debug!(pgid, "sent SIGKILL to process group"),
            Err(Errno::ESRCH) => debug!(pgid, "process group already gone"),
            Err(e) => warn!(pgid, error = %e, "failed to kill process group"),
        }
    }

    pub(super) fn kill_pid(pid: u32) {
        match signal::kill(NixPid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) => debug!(pid, "sent SIGKILL"),
            Err(Errno::ESRCH) => debug!(pid, "process already gone"),
            Err(e) => warn!(pid, error = %e, "failed to kill process"),
        }
    }
}

#[cfg(not(unix))]
fn kill_with_sysinfo(pid: u32) {
    use tracing::warn;

    let mut system = System::new();
    let spid = Pid::from_u32(pid);
    system.refresh_processes(ProcessesToUpdate::Some(&[spid]), true);
    match system.process(spid) {
        Some(process) => {
            if !process.kill() {
                warn!(pid, "failed to kill process");
            }
        }
        None => debug!(pid, "process already gone"),
    }
}

/// All descendants of `root`, deepest first.
///
/// Blocking: refreshes every process on the system.
pub fn descendants_of(root: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children
                .entry(parent.as_u32())
                .or_default()
                .push(pid.as_u32());
        }
    }

    let mut out = Vec::new();
    collect_descendants(root, &children, &mut out);
    out
}

fn collect_descendants(parent: u32, children: &HashMap<u32, Vec<u32>>, out: &mut Vec<u32>) {
    let Some(direct) = children.get(&parent) else {
        return;
    };
    for &child in direct {
        // Guard against pid reuse producing a cycle.
        if child == parent || out.contains(&child) {
            continue;
        }
        collect_descendants(child, children, out);
        out.push(child);
    }
}

/// Whether `pid` names a live process. Zombies count as dead.
pub fn is_alive(pid: u32) -> bool {
    let mut system = System::new();
    let spid = Pid::from_u32(pid);
    system.refresh_processes(ProcessesToUpdate::Some(&[spid]), true);
    match system.process(spid) {
        Some(process) => !matches!(
            process.status(),
            ProcessStatus::Zombie | ProcessStatus::Dead
        ),
        None => false,
    }
}

/// Issues the subtree kill for one run at most once.
pub struct KillSwitch {
    pid: Option<u32>,
    fired: AtomicBool,
    killer: Arc<dyn TreeKiller>,
}

impl KillSwitch {
    pub fn new(pid: Option<u32>, killer: Arc<dyn TreeKiller>) -> Self {
        Self {
            pid,
            fired: AtomicBool::new(false),
            killer,
        }
    }

    /// Kill the tree. Returns `true` only for the call that issued the kill.
    ///
    /// Blocks while the killer runs.
    pub fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            debug!(pid = ?self.pid, "kill already issued; ignoring");
            return false;
        }

        match self.pid {
            Some(pid) => {
                info!(pid, "terminating process tree");
                self.killer.kill_tree(pid);
            }
            None => debug!("no pid recorded; process already reaped"),
        }
        true
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
