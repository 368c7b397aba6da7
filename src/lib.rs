// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::io::Write;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_or_default;
use crate::config::validate::clamp_threads;
use crate::errors::{RcopyError, Result};
use crate::exec::{ProcessSupervisor, RunCoordinator, RunObserver, RunRequest, SystemTreeKiller};
use crate::types::{LineEvent, ProgressEvent, RunOutcome};

/// Exit status used by the CLI when a run was cancelled (Ctrl-C).
pub const CANCELLED_EXIT_CODE: i32 = 130;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the copy plan (mode preset, options, thread count)
/// - the run coordinator with a console observer
/// - Ctrl-C handling
///
/// Returns the exit code the `rcopy` process should use.
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_or_default(args.config.as_deref())?;
    let plan = CopyPlan::from_args(&args, &cfg)?;

    info!(command = %plan.request().display(), "copy command line");
    if args.dry_run {
        println!("{}", plan.request().display());
        return Ok(0);
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; cancelling run");
            cancel.cancel();
        });
    }

    let supervisor = ProcessSupervisor::new(Arc::new(SystemTreeKiller), cfg.drain_timeout());
    let observer = ConsoleObserver {
        show_progress: args.progress,
    };
    let coordinator = RunCoordinator::new(&plan.program, observer).with_supervisor(supervisor);

    let outcome = coordinator
        .run(&plan.source, &plan.destination, &plan.options, &cancel)
        .await?;

    match outcome {
        RunOutcome::Exited(code) => {
            eprintln!("{} exited with code {code}.", plan.program);
            Ok(code)
        }
        RunOutcome::Cancelled => {
            eprintln!("Operation cancelled.");
            Ok(CANCELLED_EXIT_CODE)
        }
    }
}

/// Everything needed for one copy, resolved from CLI flags and config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    pub program: String,
    pub source: String,
    pub destination: String,
    pub options: String,
}

impl CopyPlan {
    /// CLI flags win over the config file; `/MT:<threads>` is always appended.
    pub fn from_args(args: &CliArgs, cfg: &ConfigFile) -> Result<Self> {
        if args.source.trim().is_empty() || args.destination.trim().is_empty() {
            return Err(RcopyError::ConfigError(
                "source and destination must be set".to_string(),
            ));
        }

        let program = args
            .program
            .clone()
            .unwrap_or_else(|| cfg.program().to_string());
        let mode = args.mode.unwrap_or(cfg.default_mode());
        let base = args
            .options
            .clone()
            .unwrap_or_else(|| cfg.options_for(mode).to_string());
        let threads = clamp_threads(Some(args.threads.unwrap_or(cfg.threads())));

        Ok(Self {
            program,
            source: args.source.clone(),
            destination: args.destination.clone(),
            options: format!("{} /MT:{threads}", base.trim()).trim().to_string(),
        })
    }

    pub fn request(&self) -> RunRequest {
        RunRequest::copy(&self.program, &self.source, &self.destination, &self.options)
    }
}

/// Writes child output to stdout as it arrives, progress to stderr.
struct ConsoleObserver {
    show_progress: bool,
}

impl RunObserver for ConsoleObserver {
    fn on_line(&self, event: &LineEvent) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(event.text.as_bytes());
        let _ = out.flush();
    }

    fn on_progress(&self, event: &ProgressEvent) {
        if self.show_progress {
            eprintln!("progress: {}%", event.percent);
        }
    }
}
