//! Manual-reset run/hold signal for the worker

use parking_lot::{Condvar, Mutex};

/// Binary signal: set means "run", reset means "hold"
///
/// Stays set until explicitly reset; every waiter wakes on `set`.
#[derive(Debug, Default)]
pub struct RunSignal {
    running: Mutex<bool>,
    changed: Condvar,
}

impl RunSignal {
    /// Create a signal in the hold state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let mut running = self.running.lock();
        *running = true;
        self.changed.notify_all();
    }

    pub fn reset(&self) {
        *self.running.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.running.lock()
    }

    /// Block until the signal is set
    pub fn wait(&self) {
        let mut running = self.running.lock();
        while !*running {
            self.changed.wait(&mut running);
        }
    }
}
