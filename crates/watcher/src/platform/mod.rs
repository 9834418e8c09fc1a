//! Platform-specific notification sources
//!
//! Provides a unified interface ([`NotifySource`] plus [`SourceControl`])
//! with platform-specific implementations for Linux/Android (inotify) and
//! Windows (`ReadDirectoryChangesW`).
//!
//! The worker owns the source and is the only caller of [`NotifySource::wait`].
//! The control half is shared with lifecycle calls on arbitrary threads.

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod linux;

#[cfg(windows)]
pub mod windows;

use crate::config::WatchConfig;
use crate::error::Result;
use dirwatch_core::RawRecord;
use std::path::Path;
use std::sync::Arc;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use linux::InotifySource;

#[cfg(windows)]
pub use windows::Win32Source;

/// Why a blocking notification call returned without data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// Interrupted on purpose by [`SourceControl::cancel`]; not an error
    Cancelled,
    /// Genuine OS failure carrying the raw error code
    Os(i32),
}

/// Iterator over the records of one buffer
pub type Records<'a> = Box<dyn Iterator<Item = RawRecord<'a>> + 'a>;

/// Blocking source of raw notification buffers for one directory
pub trait NotifySource: Send {
    /// Block until notifications are available and copy them into `buf`
    ///
    /// Returns the number of bytes written.
    fn wait(&mut self, buf: &mut [u8]) -> std::result::Result<usize, WaitError>;

    /// Decode the records of a buffer filled by [`wait`](Self::wait)
    ///
    /// Sources may skip records that no longer belong to the live watch.
    fn records<'a>(&self, buf: &'a [u8]) -> Records<'a>;

    /// Handle used by lifecycle calls to steer this source
    fn control(&self) -> Arc<dyn SourceControl>;
}

/// Thread-safe half of a source
pub trait SourceControl: Send + Sync {
    /// Begin capturing changes (idempotent)
    ///
    /// Failures are reported through the next `wait` so the worker can record
    /// them.
    fn arm(&self);

    /// Stop capturing changes (idempotent)
    fn disarm(&self);

    /// Interrupt an outstanding `wait` with [`WaitError::Cancelled`]
    fn cancel(&self);
}

/// Create the platform source for `path`
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn create_source(path: &Path, _config: &WatchConfig) -> Result<Box<dyn NotifySource>> {
    Ok(Box::new(InotifySource::open(path)?))
}

#[cfg(windows)]
pub fn create_source(path: &Path, config: &WatchConfig) -> Result<Box<dyn NotifySource>> {
    Ok(Box::new(Win32Source::open(path, config.buffer_size)?))
}

#[cfg(not(any(target_os = "linux", target_os = "android", windows)))]
pub fn create_source(_path: &Path, _config: &WatchConfig) -> Result<Box<dyn NotifySource>> {
    Err(crate::error::Error::Unsupported)
}
