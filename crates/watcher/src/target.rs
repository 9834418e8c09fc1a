//! Watch targets: one open directory, one worker
//!
//! A target owns the notification source (through its worker), the run
//! signal, the exit flag, the sticky error and the callback slot. The worker
//! is spawned by `open` and joined by `close` (or drop); it is never
//! recreated.

use crate::config::WatchConfig;
use crate::error::{Error, Result};
use crate::platform::{self, NotifySource, SourceControl};
use crate::worker::{Shared, Worker};
use dirwatch_core::{ErrorKind, Event};
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Suffix for worker thread names
static NEXT_WORKER: AtomicU64 = AtomicU64::new(1);

/// An open, watchable directory
///
/// Starts paused; call [`start`](Target::start) to begin receiving events.
pub struct Target {
    /// Directory as given to open
    path: PathBuf,
    /// State shared with the worker
    shared: Arc<Shared>,
    /// Arm/disarm/cancel handle for the worker's source
    control: Arc<dyn SourceControl>,
    /// Worker thread; taken by the shutdown sequence
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Serializes start, stop and shutdown so signal and watch agree
    transition: Mutex<()>,
}

impl Target {
    /// Open a directory with the default configuration
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &WatchConfig::default())
    }

    /// Open a directory for watching
    ///
    /// Fails if `path` is missing or not a directory, or if any watch
    /// resource cannot be acquired. Nothing is left behind on failure.
    pub fn open_with_config(path: impl AsRef<Path>, config: &WatchConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(Error::io(path, e)),
        };
        if !metadata.is_dir() {
            return Err(Error::NotADirectory(path.to_path_buf()));
        }

        let source = platform::create_source(path, config)?;
        Self::from_source(path, source, config)
    }

    /// Build a target around an existing notification source
    ///
    /// Used for custom backends; `path` is only used for
    /// [`full_path`](Target::full_path) and diagnostics.
    pub fn from_source(
        path: impl Into<PathBuf>,
        source: Box<dyn NotifySource>,
        config: &WatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let path = path.into();

        let shared = Arc::new(Shared::new());
        let control = source.control();
        let worker = Worker::new(path.clone(), shared.clone(), source, config);

        let name = format!(
            "{}-{}",
            config.thread_name,
            NEXT_WORKER.fetch_add(1, Ordering::Relaxed)
        );
        // On failure the closure, and the source inside it, is dropped here
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || worker.run())
            .map_err(Error::Spawn)?;

        debug!(path = %path.display(), "target opened");

        Ok(Self {
            path,
            shared,
            control,
            worker: Mutex::new(Some(handle)),
            transition: Mutex::new(()),
        })
    }

    /// Install the callback, replacing any previous one
    ///
    /// The callback runs on the worker thread. It receives each event, or
    /// `None` once if the worker hits a fatal error. It must not block for
    /// long; hand heavy work off to another thread.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(Option<&Event>) + Send + Sync + 'static,
    {
        self.shared.callbacks.set(Arc::new(callback));
    }

    /// Remove the callback; events keep being consumed but go nowhere
    pub fn clear_callback(&self) {
        self.shared.callbacks.clear();
    }

    /// Start or resume watching (idempotent)
    pub fn start(&self) {
        let _transition = self.transition.lock();
        self.control.arm();
        self.shared.signal.set();
        trace!(path = %self.path.display(), "target started");
    }

    /// Pause watching (idempotent)
    ///
    /// Cancels a blocked notification call so the pause takes effect at once.
    /// A callback already running finishes normally. Changes made while
    /// paused are never delivered.
    pub fn stop(&self) {
        let _transition = self.transition.lock();
        self.shared.signal.reset();
        self.control.disarm();
        self.control.cancel();
        trace!(path = %self.path.display(), "target stopped");
    }

    /// Whether the target is started and its worker still alive
    pub fn is_watching(&self) -> bool {
        self.shared.signal.is_set() && !self.shared.exit_requested()
    }

    /// Error classification; stays fixed once a failure is recorded
    pub fn error(&self) -> ErrorKind {
        ErrorKind::from_os_code(self.shared.error_code())
    }

    /// Raw OS error code behind [`error`](Target::error); 0 if none
    pub fn os_error(&self) -> i32 {
        self.shared.error_code()
    }

    /// Watched directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Join an event name onto the watched directory
    pub fn full_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Whether the worker thread has returned
    pub fn is_terminated(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Stop the worker, wait for it and release every resource
    ///
    /// Blocks until a callback that is currently running returns.
    pub fn close(self) {
        self.shutdown();
    }

    /// Shutdown sequence: hold, flag exit, cancel the blocked call, wake the
    /// worker, join. Handles are released afterwards when the last owner drops.
    fn shutdown(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };

        {
            let _transition = self.transition.lock();
            self.shared.signal.reset();
            self.shared.request_exit();
            self.control.disarm();
            self.control.cancel();
            self.shared.signal.set();
        }

        if handle.thread().id() == thread::current().id() {
            // Joining here would wait on ourselves; the worker returns as soon
            // as the callback does
            warn!(
                path = %self.path.display(),
                "Target closed from its own callback; worker exits after the callback returns"
            );
            return;
        }

        if handle.join().is_err() {
            warn!(path = %self.path.display(), "Worker thread panicked");
        }
        debug!(path = %self.path.display(), "target closed");
    }
}

impl Drop for Target {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("path", &self.path)
            .field("watching", &self.is_watching())
            .field("error", &self.error())
            .finish()
    }
}
