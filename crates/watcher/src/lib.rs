//! Directory change notification
//!
//! This crate watches single directories (non-recursively) and delivers
//! add/remove/modify/rename events to a callback:
//! - One background worker per [`Target`], blocked in the OS notification call
//! - Pause and resume at any time, cancelling the blocked call on pause
//! - Swappable callbacks, replaced without tearing
//! - Deterministic shutdown that joins the worker before releasing handles
//!
//! # Example
//!
//! ```no_run
//! use dirwatch::{watch, Event};
//!
//! let target = watch("/tmp/inbox", |event: Option<&Event>| match event {
//!     Some(event) => println!("{}: {}", event.kind(), event.name()),
//!     None => eprintln!("watcher failed"),
//! })?;
//!
//! target.stop();
//! target.start();
//! target.close();
//! # Ok::<(), dirwatch::Error>(())
//! ```
//!
//! # Callbacks
//!
//! Callbacks run on the worker thread, one call per event in the order the
//! OS reported them. The event borrows library-owned storage and is only
//! valid for the duration of the call; clone it to keep it. `None` is passed
//! exactly once when the worker fails, after which the target stays silent
//! and [`Target::error`] reports the failure until the target is closed.
//! Removing or unmounting the watched directory is such a failure.
//!
//! # Pausing
//!
//! [`Target::stop`] holds the worker and cancels its blocked call. Changes
//! made while paused are not queued for later. On Linux the kernel watch is
//! removed while paused, so nothing captured before the pause leaks through
//! after `start`. On Windows changes are discarded when their buffer is read
//! while paused.
//!
//! # Handles
//!
//! [`Registry`] offers the same lifecycle through opaque [`TargetId`]s for
//! callers that cannot hold a [`Target`] directly.

pub mod callback;
pub mod config;
pub mod error;
pub mod platform;
pub mod registry;
pub mod signal;
pub mod target;

mod worker;

pub use callback::{Callback, CallbackSlot};
pub use config::WatchConfig;
pub use error::{Error, Result};
pub use registry::{Registry, TargetId};
pub use target::Target;

// Core types
pub use dirwatch_core::{Batch, ErrorKind, Event, EventKind, Translator};

use std::path::Path;

/// Open `path`, install `callback` and start watching
pub fn watch<F>(path: impl AsRef<Path>, callback: F) -> Result<Target>
where
    F: Fn(Option<&Event>) + Send + Sync + 'static,
{
    let target = Target::open(path)?;
    target.set_callback(callback);
    target.start();
    Ok(target)
}
