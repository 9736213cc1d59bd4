//! Error types for asset loading and scene switching.
//!
//! Asset-level errors ([`LoadError`]) never travel past the task that produced
//! them unless they are fatal. Switch-level errors ([`SwitchError`]) are
//! turned into a safe idle state by the controller, except for
//! [`SwitchError::Fatal`], which the application shell treats as process-fatal.

use std::path::PathBuf;

use thiserror::Error;

use crate::scene::SceneId;

/// Errors raised by a single asset load task.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File could not be read.
    #[error("IO error reading '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// File format could not be determined from the extension.
    #[error("unknown asset format: '{0}'")]
    UnknownFormat(String),
    /// The data was read but could not be decoded.
    #[error("failed to decode '{path}': {message}")]
    Decode { path: String, message: String },
    /// Data the whole process depends on is corrupt. Fatal.
    #[error("corrupt core data: {0}")]
    CoreData(String),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(path: impl Into<String>, message: impl ToString) -> Self {
        LoadError::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this failure must stop the process instead of leaving a placeholder.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::CoreData(_))
    }
}

/// A load task that did not complete, as recorded in a phase report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskFailure {
    /// Name the task was registered under.
    pub task: String,
    /// Rendered error or panic message.
    pub message: String,
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task '{}': {}", self.task, self.message)
    }
}

/// Errors from driving an [`AssetLoadQueue`](crate::AssetLoadQueue).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadQueueError {
    /// The queue was already drained once.
    #[error("load queue '{0}' was already run; build a fresh queue per phase")]
    Spent(String),
}

/// Errors from registering scene factories.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// `SceneId::NONE` and `SceneId::CUSTOM` cannot carry a factory.
    #[error("scene id {0} is reserved")]
    Reserved(SceneId),
    /// A factory is already registered for this id.
    #[error("scene id {0} is already registered")]
    Duplicate(SceneId),
}

/// Errors that abort a scene switch.
#[derive(Debug, Error)]
pub enum SwitchError {
    /// The registry has no factory for the requested id.
    #[error("no scene registered for id {0}")]
    UnknownScene(SceneId),
    /// `Scene::init` failed.
    #[error("failed to initialize scene '{scene}': {cause:#}")]
    Init { scene: String, cause: anyhow::Error },
    /// `Scene::register_assets` failed.
    #[error("failed to register assets for scene '{scene}': {cause:#}")]
    Register { scene: String, cause: anyhow::Error },
    /// `Scene::assemble` failed.
    #[error("failed to assemble scene '{scene}' (phase {phase}): {cause:#}")]
    Assemble {
        scene: String,
        phase: u8,
        cause: anyhow::Error,
    },
    /// A scene hook panicked.
    #[error("scene '{scene}' panicked during {stage}: {message}")]
    Panicked {
        scene: String,
        stage: &'static str,
        message: String,
    },
    /// The load queue could not be started.
    #[error(transparent)]
    Queue(#[from] LoadQueueError),
    /// A load task hit unrecoverable data. The process should stop.
    #[error("fatal load failure in {0}")]
    Fatal(TaskFailure),
}

impl SwitchError {
    /// Whether the error must take the process down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SwitchError::Fatal(_))
    }
}

/// Errors from reading an application config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Render a panic payload as a message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
