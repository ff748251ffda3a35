// src/progress.rs
/// Progress hooks for long-running crawls and repairs.
/// The CLI forwards them to the log; tests use `NullProgress`.
pub trait Progress {
    /// Called at the start with the number of entities queued.
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// One entity reconciled; `position` is absolute and 1-based.
    fn item_done(&mut self, _position: usize, _label: &str) {}

    /// One entity whose page could not be fetched at all.
    fn item_failed(&mut self, _position: usize, _label: &str) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}

/// Reports through `tracing`, one line per entity.
#[derive(Default)]
pub struct LogProgress {
    total: usize,
    done: usize,
    failed: usize,
}

impl Progress for LogProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
        tracing::info!(total, "processing entities");
    }

    fn log(&mut self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn item_done(&mut self, position: usize, label: &str) {
        self.done += 1;
        tracing::info!("[{}/{}] #{position} {label}", self.done + self.failed, self.total);
    }

    fn item_failed(&mut self, position: usize, label: &str) {
        self.failed += 1;
        tracing::warn!("[{}/{}] #{position} {label} unavailable", self.done + self.failed, self.total);
    }

    fn finish(&mut self) {
        tracing::info!(done = self.done, failed = self.failed, "entities processed");
    }
}
