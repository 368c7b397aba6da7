use std::sync::{Arc, Mutex};
use std::time::Duration;

use rcopy::exec::RunObserver;
use rcopy::types::{LineEvent, ProgressEvent, StreamKind};

#[derive(Debug, Default)]
struct Recorded {
    lines: Vec<LineEvent>,
    progress: Vec<ProgressEvent>,
}

/// Observer that keeps every event it receives.
///
/// Clones share the same storage, so a test can hand one clone to the
/// coordinator and inspect another.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    inner: Arc<Mutex<Recorded>>,
    line_delay: Option<Duration>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a slow consumer: every chunk blocks the pump for `delay`
    /// before it is recorded.
    pub fn with_line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = Some(delay);
        self
    }

    pub fn lines(&self) -> Vec<LineEvent> {
        self.inner.lock().unwrap().lines.clone()
    }

    pub fn line_count(&self) -> usize {
        self.inner.lock().unwrap().lines.len()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.inner
            .lock()
            .unwrap()
            .progress
            .iter()
            .map(|p| p.percent)
            .collect()
    }

    /// Concatenated text of every chunk read from `stream`.
    pub fn text(&self, stream: StreamKind) -> String {
        self.inner
            .lock()
            .unwrap()
            .lines
            .iter()
            .filter(|l| l.stream == stream)
            .map(|l| l.text.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        let guard = self.inner.lock().unwrap();
        guard.lines.is_empty() && guard.progress.is_empty()
    }
}

impl RunObserver for RecordingObserver {
    fn on_line(&self, event: &LineEvent) {
        if let Some(delay) = self.line_delay {
            std::thread::sleep(delay);
        }
        self.inner.lock().unwrap().lines.push(event.clone());
    }

    fn on_progress(&self, event: &ProgressEvent) {
        self.inner.lock().unwrap().progress.push(*event);
    }
}
