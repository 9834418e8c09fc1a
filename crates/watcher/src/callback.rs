//! Swappable callback holder shared between callers and the worker

use dirwatch_core::Event;
use parking_lot::RwLock;
use std::sync::Arc;

/// Callback invoked on the worker thread
///
/// Receives `Some(event)` for each change and `None` exactly once if the
/// worker fails. Any user context is captured by the closure itself, so the
/// callback and its context are always replaced together.
pub type Callback = Arc<dyn Fn(Option<&Event>) + Send + Sync>;

/// Reader/writer protected callback slot
///
/// Writers never observe each other half-way and readers always get one
/// complete callback. `parking_lot`'s lock is fair, so a steady stream of
/// readers cannot starve `set`.
#[derive(Default)]
pub struct CallbackSlot {
    current: RwLock<Option<Callback>>,
}

impl CallbackSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a callback, replacing the previous one
    pub fn set(&self, callback: Callback) {
        *self.current.write() = Some(callback);
    }

    /// Remove the installed callback
    pub fn clear(&self) {
        *self.current.write() = None;
    }

    /// Snapshot of the installed callback
    ///
    /// The worker takes one snapshot per notification batch; replacing the
    /// callback mid-batch only affects the next batch.
    pub fn snapshot(&self) -> Option<Callback> {
        self.current.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.current.read().is_some()
    }
}

impl std::fmt::Debug for CallbackSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSlot")
            .field("is_set", &self.is_set())
            .finish()
    }
}
