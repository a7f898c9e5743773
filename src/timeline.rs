//! Append-only diagnostic timeline shared across a batch run.

use std::sync::Arc;

use parking_lot::Mutex;

/// Ordered, timestamped diagnostic entries for one batch run.
///
/// Every stage appends; nothing removes or rewrites prior entries, so
/// handing out clones of the handle for read access is safe. The bridge
/// ships the entries alongside the records; the report/CLI surface can
/// print them.
#[derive(Debug, Clone, Default)]
pub struct ProbeTimeline {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ProbeTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, prefixed with a wall-clock timestamp.
    pub fn push(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{}", message);
        let stamped = format!(
            "[{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            message
        );
        self.entries.lock().push(stamped);
    }

    /// Snapshot of all entries in append order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
