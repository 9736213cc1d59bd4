//! Background asset loading.
//!
//! - [`AssetLoadQueue`]: the tasks of one load phase
//! - [`JobQueues`]: the single worker thread plus main-thread follow-ups
//! - [`JobProgress`]: counters the worker writes and the UI reads
//! - [`AssetSlot`]: where a task leaves its decoded result

mod jobs;
mod progress;
mod queue;
mod slot;

pub use jobs::{JobQueues, MainJob, ThreadedJob};
pub use progress::JobProgress;
pub use queue::{AssetLoadQueue, AssetLoadTask, PhaseReport};
pub use slot::{AssetSlot, Placeholder, SlotState};
