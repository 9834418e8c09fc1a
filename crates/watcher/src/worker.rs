//! Per-target worker loop
//!
//! States:
//! - Held: run signal reset, no notification call outstanding
//! - Watching: blocked in [`NotifySource::wait`]
//! - Dispatching: translating a buffer and invoking the callback per event
//! - Terminating: exit flag observed or fatal failure recorded
//!
//! The worker only ever suspends on the run signal and inside `wait`; both
//! are released by the shutdown sequence in [`crate::target`].

use crate::callback::{Callback, CallbackSlot};
use crate::config::WatchConfig;
use crate::platform::{NotifySource, WaitError};
use crate::signal::RunSignal;
use dirwatch_core::{ErrorKind, Translator};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use tracing::{debug, debug_span, error, trace, warn};

/// State shared between a target and its worker
///
/// The exit flag and error code are written at most once each and read from
/// any thread, so they are atomics. The callback slot is the only state
/// written by both sides and carries its own lock.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    /// Run (set) / hold (reset)
    pub(crate) signal: RunSignal,
    /// Worker must return at the next opportunity
    pub(crate) exit: AtomicBool,
    /// Sticky raw OS error; 0 = none, first write wins
    pub(crate) error: AtomicI32,
    /// Current callback
    pub(crate) callbacks: CallbackSlot,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a fatal OS error; returns false if one was already recorded
    pub(crate) fn record_error(&self, code: i32) -> bool {
        self.error
            .compare_exchange(0, code, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn error_code(&self) -> i32 {
        self.error.load(Ordering::Acquire)
    }

    /// Set the exit flag; returns the previous value
    pub(crate) fn request_exit(&self) -> bool {
        self.exit.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }
}

/// Background execution unit for one target
pub(crate) struct Worker {
    path: PathBuf,
    shared: Arc<Shared>,
    source: Box<dyn NotifySource>,
    translator: Translator,
    buffer: Vec<u8>,
}

impl Worker {
    pub(crate) fn new(
        path: PathBuf,
        shared: Arc<Shared>,
        source: Box<dyn NotifySource>,
        config: &WatchConfig,
    ) -> Self {
        Self {
            path,
            shared,
            source,
            translator: Translator::new(config.batch_capacity),
            buffer: vec![0u8; config.buffer_size],
        }
    }

    /// Thread body; returns once the target terminates
    pub(crate) fn run(mut self) {
        let span = debug_span!("worker", path = %self.path.display());
        let _entered = span.enter();

        loop {
            // Held
            self.shared.signal.wait();
            if self.shared.exit_requested() {
                trace!("exit flag observed");
                break;
            }

            // Watching
            let result = self.source.wait(&mut self.buffer);
            let callback = self.shared.callbacks.snapshot();

            match result {
                Ok(len) => {
                    // Paused while blocked: nothing captured before the pause
                    // is delivered after it
                    if !self.shared.signal.is_set() {
                        trace!(bytes = len, "discarding buffer read across a pause");
                        continue;
                    }
                    self.dispatch(len, callback.as_ref());
                    if self.shared.exit_requested() {
                        trace!("exit flag observed after dispatch");
                        break;
                    }
                }
                Err(WaitError::Cancelled) => {
                    trace!("notification wait cancelled");
                }
                Err(WaitError::Os(code)) => {
                    self.fail(code, callback.as_ref());
                    break;
                }
            }
        }

        debug!("worker terminated");
    }

    fn dispatch(&self, len: usize, callback: Option<&Callback>) {
        let records = self.source.records(&self.buffer[..len]);

        let batch = match self.translator.translate(records) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Discarding notification batch: {}", e);
                return;
            }
        };

        if batch.is_truncated() {
            warn!(
                total = batch.total(),
                delivered = batch.materialized(),
                "Notification batch exceeded capacity; {} records dropped",
                batch.dropped()
            );
        }
        debug!(events = batch.materialized(), "dispatching batch");

        if let Some(callback) = callback {
            for event in &batch {
                callback(Some(event));
            }
        }
    }

    fn fail(&self, code: i32, callback: Option<&Callback>) {
        self.shared.record_error(code);
        self.shared.request_exit();

        error!(
            errno = code,
            kind = %ErrorKind::from_os_code(code),
            "Notification wait failed; worker terminating"
        );

        if let Some(callback) = callback {
            callback(None);
        }
    }
}
