//! Progress counters shared between the worker and the main thread.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Counters {
    message: String,
    num: usize,
    max: usize,
}

/// Thread-safe progress state for a loading indicator.
///
/// The worker writes, the UI reads. If `max` is 0 only `num` is meaningful;
/// otherwise `num / max` is the fraction done.
#[derive(Debug, Default)]
pub struct JobProgress {
    counters: Mutex<Counters>,
    running: AtomicBool,
}

impl JobProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_progress_message(&self) -> String {
        self.counters.lock().message.clone()
    }

    pub fn job_progress_num(&self) -> usize {
        self.counters.lock().num
    }

    pub fn job_progress_max(&self) -> usize {
        self.counters.lock().max
    }

    /// `(num, max)` read under one lock.
    pub fn snapshot(&self) -> (usize, usize) {
        let counters = self.counters.lock();
        (counters.num, counters.max)
    }

    /// Whether the background worker is executing a job.
    pub fn job_is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Fraction done in `[0, 1]`, or `None` when there is no maximum.
    pub fn fraction(&self) -> Option<f32> {
        let counters = self.counters.lock();
        (counters.max > 0).then(|| counters.num as f32 / counters.max as f32)
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.counters.lock().message = message.into();
    }

    pub(crate) fn begin(&self, message: impl Into<String>, max: usize) {
        let mut counters = self.counters.lock();
        counters.message = message.into();
        counters.num = 0;
        counters.max = max;
    }

    pub(crate) fn advance(&self) {
        self.counters.lock().num += 1;
    }

    pub(crate) fn reset(&self) {
        *self.counters.lock() = Counters::default();
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}
