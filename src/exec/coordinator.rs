// src/exec/coordinator.rs

//! Public entry point for a single copy run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::command::RunRequest;
use crate::exec::observer::RunObserver;
use crate::exec::supervisor::ProcessSupervisor;
use crate::types::RunOutcome;

/// Runs a copy tool and reports its output to one observer.
///
/// Every call to [`run`](Self::run) is independent; the coordinator does not
/// serialise concurrent runs.
pub struct RunCoordinator {
    program: String,
    supervisor: ProcessSupervisor,
    observer: Arc<dyn RunObserver>,
}

impl RunCoordinator {
    pub fn new(program: impl Into<String>, observer: impl RunObserver + 'static) -> Self {
        Self::with_observer(program, Arc::new(observer))
    }

    pub fn with_observer(program: impl Into<String>, observer: Arc<dyn RunObserver>) -> Self {
        Self {
            program: program.into(),
            supervisor: ProcessSupervisor::default(),
            observer,
        }
    }

    pub fn with_supervisor(mut self, supervisor: ProcessSupervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    /// Copy `source` to `destination`, passing `options` through verbatim.
    pub async fn run(
        &self,
        source: &str,
        destination: &str,
        options: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let request = RunRequest::copy(&self.program, source, destination, options);
        self.run_request(&request, cancel).await
    }

    /// Run an arbitrary request.
    ///
    /// Resolves once the child has exited (or been killed) **and** both pumps
    /// have settled; no observer callback fires after this returns. A token
    /// cancelled before the call yields `Cancelled` without starting anything,
    /// and one cancelled before the pumps settle yields `Cancelled` too.
    pub async fn run_request(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        if cancel.is_cancelled() {
            info!(program = %request.program(), "cancelled before start; not launching");
            return Ok(RunOutcome::Cancelled);
        }

        info!(command = %request.display(), "starting run");
        let mut run = self.supervisor.spawn(request, Arc::clone(&self.observer))?;

        let exited = run.wait(cancel).await;
        let drained = run.drain(cancel).await;
        debug!(reports = ?drained.reports, "pumps drained");

        // A cancel that lands while output is still draining preempts the
        // exit code as well.
        let outcome = if drained.killed {
            RunOutcome::Cancelled
        } else {
            exited
        };

        match outcome {
            RunOutcome::Exited(code) => info!(exit_code = code, "run finished"),
            RunOutcome::Cancelled => info!("run cancelled"),
        }
        Ok(outcome)
    }
}
