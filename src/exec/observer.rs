// src/exec/observer.rs

//! Event surface of a run.
//!
//! A [`RunObserver`] is handed to the coordinator once and receives every
//! chunk and every detected percentage. Callbacks fire on whichever tokio
//! worker runs the pump; callers that need thread affinity re-dispatch
//! themselves.
//!
//! - [`FnObserver`] wraps a pair of closures.
//! - [`ChannelObserver`] forwards into an unbounded mpsc channel so a
//!   consumer can `recv()` while the run is being awaited elsewhere.
//! - `()` discards everything.

use tokio::sync::mpsc;

use crate::types::{LineEvent, ProgressEvent};

pub trait RunObserver: Send + Sync {
    fn on_line(&self, event: &LineEvent);

    fn on_progress(&self, event: &ProgressEvent);
}

impl RunObserver for () {
    fn on_line(&self, _event: &LineEvent) {}

    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Observer built from two closures.
pub struct FnObserver<L, P> {
    on_line: L,
    on_progress: P,
}

impl<L, P> FnObserver<L, P>
where
    L: Fn(&LineEvent) + Send + Sync,
    P: Fn(&ProgressEvent) + Send + Sync,
{
    pub fn new(on_line: L, on_progress: P) -> Self {
        Self {
            on_line,
            on_progress,
        }
    }
}

impl<L, P> RunObserver for FnObserver<L, P>
where
    L: Fn(&LineEvent) + Send + Sync,
    P: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_line(&self, event: &LineEvent) {
        (self.on_line)(event)
    }

    fn on_progress(&self, event: &ProgressEvent) {
        (self.on_progress)(event)
    }
}

/// Events as delivered through a [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Line(LineEvent),
    Progress(ProgressEvent),
}

/// Observer that forwards into an unbounded channel.
///
/// Unbounded so a pump never blocks on a consumer that only starts reading
/// after the run returns. Sends to a dropped receiver are ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RunObserver for ChannelObserver {
    fn on_line(&self, event: &LineEvent) {
        let _ = self.tx.send(RunEvent::Line(event.clone()));
    }

    fn on_progress(&self, event: &ProgressEvent) {
        let _ = self.tx.send(RunEvent::Progress(*event));
    }
}
