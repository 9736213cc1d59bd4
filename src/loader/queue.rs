//! Per-phase lists of background load tasks.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::AssetPaths;
use crate::error::{panic_message, LoadError, LoadQueueError, TaskFailure};
use crate::font::FontAtlasData;
use crate::geometry::{GeometryOptions, RawGeometry};
use crate::loader::{AssetSlot, JobProgress, JobQueues};
use crate::shader::ShaderSource;
use crate::texture::ImageData;

/// A background-safe unit of work: CPU-side I/O and decoding only.
pub type AssetLoadTask = Box<dyn FnOnce() -> Result<(), LoadError> + Send + 'static>;

struct NamedTask {
    name: String,
    run: AssetLoadTask,
}

/// Outcome of one drained queue, delivered on the main thread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhaseReport {
    pub label: String,
    /// Tasks that returned `Ok`.
    pub completed: usize,
    /// Recoverable failures. Their slots are `Missing`.
    pub failures: Vec<TaskFailure>,
    /// Set when a task hit corrupt core data or panicked. Remaining tasks were skipped.
    pub fatal: Option<TaskFailure>,
    pub elapsed: Duration,
}

impl PhaseReport {
    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.fatal.is_none()
    }
}

/// Ordered load tasks for one phase of one scene.
///
/// A queue is filled, drained once with [`run_async`](Self::run_async) or
/// [`load_sync`](Self::load_sync), and is spent afterwards. Tasks added to a
/// spent queue are dropped with a warning.
pub struct AssetLoadQueue {
    label: String,
    paths: AssetPaths,
    tasks: Vec<NamedTask>,
    spent: bool,
}

impl AssetLoadQueue {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_paths(label, AssetPaths::default())
    }

    pub fn with_paths(label: impl Into<String>, paths: AssetPaths) -> Self {
        Self {
            label: label.into(),
            paths,
            tasks: Vec::new(),
            spent: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn paths(&self) -> &AssetPaths {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Append a task. Returns `false` and drops the task if the queue was already run.
    pub fn add_task<F>(&mut self, name: impl Into<String>, task: F) -> bool
    where
        F: FnOnce() -> Result<(), LoadError> + Send + 'static,
    {
        let name = name.into();
        if self.spent {
            tracing::warn!(
                "[loader] queue '{}' already ran, dropping task '{}'",
                self.label,
                name
            );
            return false;
        }
        self.tasks.push(NamedTask {
            name,
            run: Box::new(task),
        });
        true
    }

    /// Decode an image from the texture directory into `slot`.
    pub fn add_texture(&mut self, slot: &AssetSlot<ImageData>, path: impl AsRef<Path>) -> bool {
        let path = self.paths.texture(path);
        let slot = slot.clone();
        self.add_task(format!("texture {}", path.display()), move || {
            store(&slot, ImageData::from_file(&path))
        })
    }

    /// Decode a model from the model directory and post-process it with `options`.
    pub fn add_geometry(
        &mut self,
        slot: &AssetSlot<RawGeometry>,
        path: impl AsRef<Path>,
        options: GeometryOptions,
    ) -> bool {
        let path = self.paths.model(path);
        let slot = slot.clone();
        self.add_task(format!("model {}", path.display()), move || {
            let geometry = RawGeometry::from_file(&path).map(|mut g| {
                options.apply(&mut g);
                g
            });
            store(&slot, geometry)
        })
    }

    pub fn add_shader(&mut self, slot: &AssetSlot<ShaderSource>, path: impl AsRef<Path>) -> bool {
        let path = self.paths.shader(path);
        let slot = slot.clone();
        self.add_task(format!("shader {}", path.display()), move || {
            store(&slot, ShaderSource::from_file(&path))
        })
    }

    /// Rasterize a font from the font directory at `size` pixels.
    pub fn add_font(
        &mut self,
        slot: &AssetSlot<FontAtlasData>,
        path: impl AsRef<Path>,
        size: f32,
    ) -> bool {
        let path = self.paths.font(path);
        let slot = slot.clone();
        self.add_task(format!("font {}", path.display()), move || {
            store(&slot, FontAtlasData::from_file(&path, size))
        })
    }

    /// Read a file from the data directory as raw bytes.
    pub fn add_raw_data(&mut self, slot: &AssetSlot<Vec<u8>>, path: impl AsRef<Path>) -> bool {
        let path = self.paths.data_file(path);
        let slot = slot.clone();
        self.add_task(format!("data {}", path.display()), move || {
            store(&slot, std::fs::read(&path).map_err(|e| LoadError::io(&path, e)))
        })
    }

    /// Hand every task to the background worker as one job.
    ///
    /// `on_complete` runs on the main thread from
    /// [`JobQueues::handle_parallel_job`] once the batch has finished.
    pub fn run_async<F>(&mut self, jobs: &mut JobQueues, on_complete: F) -> Result<(), LoadQueueError>
    where
        F: FnOnce(PhaseReport) + 'static,
    {
        let tasks = self.drain()?;
        let label = self.label.clone();
        let progress = jobs.progress();
        let report: Arc<Mutex<Option<PhaseReport>>> = Arc::default();

        tracing::debug!("[loader] '{}': {} task(s) submitted", label, tasks.len());

        let worker_report = Arc::clone(&report);
        let worker_label = label.clone();
        jobs.spawn_threaded(move || {
            let result = run_batch(&worker_label, tasks, &progress);
            *worker_report.lock() = Some(result);
        });

        jobs.follow_in_main(move || {
            let result = report.lock().take().unwrap_or_else(|| PhaseReport {
                fatal: Some(TaskFailure {
                    task: label.clone(),
                    message: "batch ended without a report".to_string(),
                }),
                label,
                ..Default::default()
            });
            on_complete(result);
        });

        Ok(())
    }

    /// Run every task on the calling thread.
    pub fn load_sync(&mut self, progress: &JobProgress) -> Result<PhaseReport, LoadQueueError> {
        let tasks = self.drain()?;
        Ok(run_batch(&self.label, tasks, progress))
    }

    fn drain(&mut self) -> Result<Vec<NamedTask>, LoadQueueError> {
        if self.spent {
            return Err(LoadQueueError::Spent(self.label.clone()));
        }
        self.spent = true;
        Ok(std::mem::take(&mut self.tasks))
    }
}

fn store<T: Send + 'static>(slot: &AssetSlot<T>, result: Result<T, LoadError>) -> Result<(), LoadError> {
    match result {
        Ok(value) => {
            slot.fill(value);
            Ok(())
        }
        Err(err) => {
            slot.mark_missing(err.to_string());
            Err(err)
        }
    }
}

fn run_batch(label: &str, tasks: Vec<NamedTask>, progress: &JobProgress) -> PhaseReport {
    let started = Instant::now();
    let mut report = PhaseReport {
        label: label.to_string(),
        ..Default::default()
    };

    progress.begin(format!("Loading {label}"), tasks.len());

    for NamedTask { name, run } in tasks {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(run)) {
            Ok(Ok(())) => report.completed += 1,
            Ok(Err(err)) if err.is_fatal() => {
                tracing::error!("[loader] '{label}': task '{name}' hit fatal data: {err}");
                report.fatal = Some(TaskFailure {
                    task: name,
                    message: err.to_string(),
                });
                break;
            }
            Ok(Err(err)) => {
                tracing::error!("[loader] '{label}': task '{name}' failed: {err}");
                report.failures.push(TaskFailure {
                    task: name,
                    message: err.to_string(),
                });
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("[loader] '{label}': task '{name}' panicked: {message}");
                report.fatal = Some(TaskFailure {
                    task: name,
                    message,
                });
                break;
            }
        }
        progress.advance();
    }

    progress.reset();
    report.elapsed = started.elapsed();

    tracing::debug!(
        "[loader] '{}': {} ok, {} failed in {:.1}ms",
        label,
        report.completed,
        report.failures.len(),
        report.elapsed.as_secs_f64() * 1000.0
    );
    report
}
