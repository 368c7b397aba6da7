use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rcopy::exec::TreeKiller;

/// `TreeKiller` that counts calls and optionally delegates to a real one.
#[derive(Clone, Default)]
pub struct CountingKiller {
    calls: Arc<AtomicUsize>,
    inner: Option<Arc<dyn TreeKiller>>,
}

impl CountingKiller {
    /// Counts but kills nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts, then forwards to `inner`.
    pub fn wrapping(inner: impl TreeKiller + 'static) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            inner: Some(Arc::new(inner)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TreeKiller for CountingKiller {
    fn kill_tree(&self, pid: u32) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(inner) = &self.inner {
            inner.kill_tree(pid);
        }
    }
}
