// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the copy tool with `tokio::process::Command` and turns its output
//! into events for the caller.
//!
//! - [`command`] builds [`RunRequest`]s and owns the quoting rule.
//! - [`progress`] finds percentages in raw output.
//! - [`pump`] drains one child stream per Tokio task.
//! - [`observer`] is the event surface handed to a run.
//! - [`terminate`] kills a process together with its descendants.
//! - [`supervisor`] starts the child, wires the pumps and handles cancel.
//! - [`coordinator`] ties it together into one awaitable run.

pub mod command;
pub mod coordinator;
pub mod observer;
pub mod progress;
pub mod pump;
pub mod supervisor;
pub mod terminate;

pub use command::{RunRequest, quote};
pub use coordinator::RunCoordinator;
pub use observer::{ChannelObserver, FnObserver, RunEvent, RunObserver};
pub use supervisor::{Drained, ProcessSupervisor, SupervisedRun};
pub use terminate::{KillSwitch, SystemTreeKiller, TreeKiller};
