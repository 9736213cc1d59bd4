//! Shared cells that load tasks fill in and scenes read back.

use std::sync::Arc;

use parking_lot::Mutex;

/// State of an [`AssetSlot`].
#[derive(Clone, Debug, PartialEq)]
pub enum SlotState<T> {
    /// No task has written to the slot yet.
    Pending,
    /// The asset was decoded successfully.
    Ready(T),
    /// Loading failed; the scene should fall back to a placeholder.
    Missing(String),
}

/// Values that have a stand-in to use when loading fails.
pub trait Placeholder {
    fn placeholder() -> Self;
}

/// A handle a scene owns and a background task writes into.
///
/// Cloning the slot clones the handle, not the value. A task holds its own
/// clone, so dropping the scene while the task still runs is fine; the
/// write then lands in a cell nobody reads.
pub struct AssetSlot<T> {
    inner: Arc<Mutex<SlotState<T>>>,
}

impl<T> Clone for AssetSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for AssetSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AssetSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotState::Pending)),
        }
    }

    /// Store a decoded value.
    pub fn fill(&self, value: T) {
        *self.inner.lock() = SlotState::Ready(value);
    }

    /// Mark the slot as failed.
    pub fn mark_missing(&self, reason: impl Into<String>) {
        *self.inner.lock() = SlotState::Missing(reason.into());
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.inner.lock(), SlotState::Ready(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(*self.inner.lock(), SlotState::Missing(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.inner.lock(), SlotState::Pending)
    }

    /// Take the value out, leaving the slot pending again.
    ///
    /// Returns `None` if the slot is pending or missing.
    pub fn take(&self) -> Option<T> {
        let mut guard = self.inner.lock();
        match std::mem::replace(&mut *guard, SlotState::Pending) {
            SlotState::Ready(value) => Some(value),
            other => {
                *guard = other;
                None
            }
        }
    }

    /// Number of live handles to this slot (scene plus in-flight tasks).
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T: Clone> AssetSlot<T> {
    /// Snapshot of the current state.
    pub fn state(&self) -> SlotState<T> {
        self.inner.lock().clone()
    }
}

impl<T: Placeholder> AssetSlot<T> {
    /// Take the loaded value, or the placeholder if loading failed or never happened.
    pub fn take_or_placeholder(&self) -> T {
        self.take().unwrap_or_else(T::placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Blob(u8);

    impl Placeholder for Blob {
        fn placeholder() -> Self {
            Blob(0)
        }
    }

    #[test]
    fn take_empties_a_ready_slot() {
        let slot = AssetSlot::new();
        slot.fill(Blob(7));
        assert!(slot.is_ready());
        assert_eq!(slot.take(), Some(Blob(7)));
        assert!(slot.is_pending());
    }

    #[test]
    fn missing_slot_keeps_its_reason() {
        let slot: AssetSlot<Blob> = AssetSlot::new();
        slot.mark_missing("no such file");
        assert_eq!(slot.take(), None);
        assert!(slot.is_missing());
        assert_eq!(slot.take_or_placeholder(), Blob(0));
    }

    #[test]
    fn clones_share_the_cell() {
        let slot = AssetSlot::new();
        let task_side = slot.clone();
        assert_eq!(slot.handle_count(), 2);
        task_side.fill(3u32);
        drop(task_side);
        assert_eq!(slot.state(), SlotState::Ready(3));
        assert_eq!(slot.handle_count(), 1);
    }
}
