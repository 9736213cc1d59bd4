//! The background worker and its two job queues.
//!
//! Jobs queued with [`JobQueues::spawn_threaded`] run one at a time on a
//! single dedicated worker thread. Jobs queued with
//! [`JobQueues::follow_in_main`] run on the main thread once the worker is
//! idle and no threaded job is left. [`JobQueues::handle_parallel_job`] drives
//! both and must be called once per frame from the main thread.
//!
//! Threaded jobs must not touch the GPU. They are `Send`, and everything
//! that can issue graphics calls ([`AssetManager`](crate::AssetManager),
//! [`GpuContext`](crate::GpuContext) handles held by the app) is not.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::panic_message;
use crate::loader::JobProgress;

/// A unit of work for the background worker.
pub type ThreadedJob = Box<dyn FnOnce() + Send + 'static>;

/// A continuation that runs on the main thread.
pub type MainJob = Box<dyn FnOnce() + 'static>;

/// Queues feeding the single background worker and the main-thread follow-ups.
pub struct JobQueues {
    to_be_threaded: VecDeque<ThreadedJob>,
    to_follow_in_main: VecDeque<MainJob>,
    progress: Arc<JobProgress>,
    sender: Option<flume::Sender<ThreadedJob>>,
    worker: Option<JoinHandle<()>>,
}

impl JobQueues {
    /// Spawn the worker thread.
    pub fn new(progress: Arc<JobProgress>) -> std::io::Result<Self> {
        let (sender, receiver) = flume::unbounded::<ThreadedJob>();
        let worker_progress = Arc::clone(&progress);

        let worker = thread::Builder::new()
            .name("stagehand-loader".into())
            .spawn(move || {
                tracing::debug!("[jobs] worker started");
                while let Ok(job) = receiver.recv() {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        tracing::error!(
                            "[jobs] threaded job panicked: {}",
                            panic_message(payload.as_ref())
                        );
                    }
                    worker_progress.set_running(false);
                }
                tracing::debug!("[jobs] worker stopped");
            })?;

        Ok(Self {
            to_be_threaded: VecDeque::new(),
            to_follow_in_main: VecDeque::new(),
            progress,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Progress counters shared with the worker.
    pub fn progress(&self) -> Arc<JobProgress> {
        Arc::clone(&self.progress)
    }

    /// Queue a job for the background worker.
    pub fn spawn_threaded(&mut self, job: impl FnOnce() + Send + 'static) {
        self.to_be_threaded.push_back(Box::new(job));
    }

    /// Queue a continuation for the main thread, run after the worker drained.
    pub fn follow_in_main(&mut self, job: impl FnOnce() + 'static) {
        self.to_follow_in_main.push_back(Box::new(job));
    }

    /// Whether the worker is executing a job right now.
    pub fn job_is_running(&self) -> bool {
        self.progress.job_is_running()
    }

    /// Nothing queued, nothing running, nothing left to follow.
    pub fn is_idle(&self) -> bool {
        !self.job_is_running() && self.to_be_threaded.is_empty() && self.to_follow_in_main.is_empty()
    }

    pub fn threaded_len(&self) -> usize {
        self.to_be_threaded.len()
    }

    pub fn follow_len(&self) -> usize {
        self.to_follow_in_main.len()
    }

    /// Dispatch the next threaded job, or run the follow-ups once all threaded work is done.
    ///
    /// Returns the number of main-thread follow-ups executed.
    pub fn handle_parallel_job(&mut self) -> usize {
        if self.job_is_running() {
            return 0;
        }

        if let Some(job) = self.to_be_threaded.pop_front() {
            self.dispatch(job);
            return 0;
        }

        let follow: Vec<MainJob> = self.to_follow_in_main.drain(..).collect();
        let count = follow.len();
        for job in follow {
            job();
        }
        count
    }

    fn dispatch(&mut self, job: ThreadedJob) {
        self.progress.set_running(true);

        let Some(sender) = &self.sender else {
            self.run_inline(job);
            return;
        };

        if let Err(flume::SendError(job)) = sender.send(job) {
            tracing::error!("[jobs] worker is gone, running job on the main thread");
            self.sender = None;
            self.run_inline(job);
        }
    }

    fn run_inline(&self, job: ThreadedJob) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            tracing::error!(
                "[jobs] job panicked: {}",
                panic_message(payload.as_ref())
            );
        }
        self.progress.set_running(false);
    }
}

impl Drop for JobQueues {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop after its current job.
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("[jobs] worker thread panicked during shutdown");
            }
        }
    }
}
