// tests/cancellation.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, sh, wait_until, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rcopy::exec::terminate::{KillSwitch, SystemTreeKiller, TreeKiller, is_alive};
use rcopy::exec::{ProcessSupervisor, RunCoordinator};
use rcopy::types::{RunOutcome, StreamKind};
use rcopy_test_utils::{CountingKiller, RecordingObserver};

type TestResult = Result<(), Box<dyn Error>>;

/// Starts a background `sleep` (a grandchild of the run), reports its pid and
/// then blocks on it.
const SPAWNS_GRANDCHILD: &str = "sleep 30 & echo \"grandchild:$!\"; wait";

/// Exits right away, leaving a background `sleep` holding both pipes.
const ORPHANS_GRANDCHILD: &str = "sleep 20 & echo \"grandchild:$!\"";

fn grandchild_pid(observer: &RecordingObserver) -> Option<u32> {
    let text = observer.text(StreamKind::Stdout);
    let line = text.lines().find(|l| l.starts_with("grandchild:"))?;
    line.trim_start_matches("grandchild:").trim().parse().ok()
}

async fn wait_for_grandchild(observer: &RecordingObserver) -> u32 {
    assert!(
        wait_until(Duration::from_secs(5), || grandchild_pid(observer).is_some()).await,
        "child never reported its grandchild"
    );
    grandchild_pid(observer).unwrap()
}

async fn assert_dead(pid: u32) {
    assert!(
        wait_until(Duration::from_secs(3), || !is_alive(pid)).await,
        "process {pid} still running after cancellation"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_kills_child_and_grandchild() -> TestResult {
    init_tracing();

    let observer = RecordingObserver::new();
    let coordinator = Arc::new(RunCoordinator::new("sh", observer.clone()));
    let cancel = CancellationToken::new();

    let run = {
        let coordinator = Arc::clone(&coordinator);
        let cancel = cancel.clone();
        tokio::spawn(async move { coordinator.run_request(&sh(SPAWNS_GRANDCHILD), &cancel).await })
    };

    let grandchild = wait_for_grandchild(&observer).await;
    assert!(is_alive(grandchild));

    cancel.cancel();
    let outcome = with_timeout(run).await??;

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(outcome.is_cancelled());
    assert_dead(grandchild).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn supervised_child_is_gone_after_cancel() -> TestResult {
    init_tracing();

    let observer = RecordingObserver::new();
    let supervisor = ProcessSupervisor::default();
    let mut run = supervisor.spawn(&sh(SPAWNS_GRANDCHILD), Arc::new(observer.clone()))?;
    let child = run.pid().expect("spawned child has a pid");

    let grandchild = wait_for_grandchild(&observer).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = with_timeout(run.wait(&cancel)).await;
    assert_eq!(outcome, RunOutcome::Cancelled);

    let drained = with_timeout(run.drain(&cancel)).await;
    assert!(drained.killed);
    assert_dead(child).await;
    assert_dead(grandchild).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn double_cancel_issues_one_kill() -> TestResult {
    init_tracing();

    let killer = CountingKiller::wrapping(SystemTreeKiller);
    let supervisor = ProcessSupervisor::new(Arc::new(killer.clone()), Duration::from_secs(2));
    let coordinator = Arc::new(RunCoordinator::new("sh", ()).with_supervisor(supervisor));
    let cancel = CancellationToken::new();

    let run = {
        let coordinator = Arc::clone(&coordinator);
        let cancel = cancel.clone();
        tokio::spawn(async move { coordinator.run_request(&sh("sleep 30"), &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    cancel.cancel();

    let outcome = with_timeout(run).await??;
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(killer.calls(), 1);
    Ok(())
}

#[test]
fn kill_switch_fires_once() {
    init_tracing();

    let killer = CountingKiller::new();
    let switch = KillSwitch::new(Some(4_000_000), Arc::new(killer.clone()));

    assert!(!switch.is_fired());
    assert!(switch.trigger());
    assert!(!switch.trigger(), "second trigger must be a no-op");
    assert!(switch.is_fired());
    assert_eq!(killer.calls(), 1);
}

#[test]
fn kill_switch_without_pid_does_not_call_killer() {
    let killer = CountingKiller::new();
    let switch = KillSwitch::new(None, Arc::new(killer.clone()));

    assert!(switch.trigger());
    assert_eq!(killer.calls(), 0);
}

#[tokio::test]
async fn killing_an_exited_process_is_silent() -> TestResult {
    init_tracing();

    let mut child = tokio::process::Command::new("true").spawn()?;
    let pid = child.id().expect("pid before exit");
    child.wait().await?;

    // Already reaped: nothing to kill, nothing to report.
    SystemTreeKiller.kill_tree(pid);
    SystemTreeKiller.kill_tree(pid);
    assert!(!is_alive(pid));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_after_exit_keeps_the_exit_code() -> TestResult {
    init_tracing();

    let killer = CountingKiller::new();
    let supervisor = ProcessSupervisor::new(Arc::new(killer.clone()), Duration::from_secs(1));
    let coordinator = RunCoordinator::new("sh", ()).with_supervisor(supervisor);
    let cancel = CancellationToken::new();

    let outcome = with_timeout(coordinator.run_request(&sh("exit 3"), &cancel)).await?;
    cancel.cancel();

    assert_eq!(outcome, RunOutcome::Exited(3));
    assert_eq!(killer.calls(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pumps_are_abandoned_when_a_survivor_holds_the_pipe() -> TestResult {
    init_tracing();

    // A killer that does nothing leaves the grandchild holding stdout open;
    // the drain grace period must still let the run finish.
    let killer = CountingKiller::new();
    let supervisor = ProcessSupervisor::new(Arc::new(killer.clone()), Duration::from_millis(200));
    let observer = RecordingObserver::new();
    let coordinator = Arc::new(RunCoordinator::new("sh", observer.clone()).with_supervisor(supervisor));
    let cancel = CancellationToken::new();

    let run = {
        let coordinator = Arc::clone(&coordinator);
        let cancel = cancel.clone();
        tokio::spawn(async move { coordinator.run_request(&sh(SPAWNS_GRANDCHILD), &cancel).await })
    };

    let grandchild = wait_for_grandchild(&observer).await;
    cancel.cancel();

    let outcome = with_timeout(run).await??;
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(killer.calls(), 1);

    SystemTreeKiller.kill_tree(grandchild);
    assert_dead(grandchild).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_after_child_exit_stops_a_pipe_holding_descendant() -> TestResult {
    init_tracing();

    let observer = RecordingObserver::new();
    let supervisor = ProcessSupervisor::new(Arc::new(SystemTreeKiller), Duration::from_secs(2));
    let coordinator = Arc::new(RunCoordinator::new("sh", observer.clone()).with_supervisor(supervisor));
    let cancel = CancellationToken::new();

    let run = {
        let coordinator = Arc::clone(&coordinator);
        let cancel = cancel.clone();
        tokio::spawn(async move { coordinator.run_request(&sh(ORPHANS_GRANDCHILD), &cancel).await })
    };

    let grandchild = wait_for_grandchild(&observer).await;
    // The shell is gone by now; only the drain is holding the run open.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!run.is_finished());
    cancel.cancel();

    let outcome = with_timeout(run).await??;
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_dead(grandchild).await;
    Ok(())
}
