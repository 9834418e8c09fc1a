//! Linux/Android notification source backed by inotify
//!
//! The inotify descriptor is non-blocking and polled through `mio` together
//! with a `Waker`, which is how a blocked `wait` gets cancelled.
//!
//! Pausing removes the directory watch and resuming adds a fresh one. The
//! kernel never reuses a watch descriptor right away, so records still queued
//! from before a pause (including the `IN_IGNORED` the removal produces)
//! carry a stale descriptor and are filtered out by [`InotifySource::records`].
//!
//! Records about the watch itself are never delivered. Removal of the watched
//! directory (`IN_DELETE_SELF` or `IN_IGNORED` on the live descriptor) fails
//! the next `wait` with `ENOENT`; a queue overflow is logged.

use super::{NotifySource, Records, SourceControl, WaitError};
use crate::error::{Error, Result};
use dirwatch_core::InotifyRecords;
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token, Waker};
use parking_lot::Mutex;
use std::ffi::CString;
use std::fs::File;
use std::io::{self, Read};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

const INOTIFY: Token = Token(0);
const WAKE: Token = Token(1);

/// Descriptor value while no watch is armed
const NO_WATCH: i32 = i32::MIN;

const WATCH_MASK: u32 = libc::IN_CREATE
    | libc::IN_DELETE
    | libc::IN_MODIFY
    | libc::IN_MOVED_FROM
    | libc::IN_MOVED_TO
    | libc::IN_DELETE_SELF
    | libc::IN_ONLYDIR;

/// The live watch is gone
const WATCH_REMOVED: u32 = libc::IN_DELETE_SELF | libc::IN_IGNORED;

/// Mask bits of records that describe the watch rather than an entry
const WATCH_RECORDS: u32 = WATCH_REMOVED | libc::IN_Q_OVERFLOW;

fn os_code(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(libc::EIO)
}

/// Shared inotify state
struct InotifyControl {
    /// inotify descriptor, closed when the last owner drops
    fd: File,
    /// Watched directory
    path: CString,
    /// Armed watch descriptor; serializes arm/disarm
    armed: Mutex<Option<i32>>,
    /// Copy of the armed descriptor for the decoder (NO_WATCH when disarmed)
    current: AtomicI32,
    /// errno from a failed arm, surfaced by the next wait
    arm_error: AtomicI32,
    waker: Waker,
}

impl InotifyControl {
    /// Keep the first failure for the next wait
    fn park_error(&self, code: i32) {
        let _ = self
            .arm_error
            .compare_exchange(0, code, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl SourceControl for InotifyControl {
    fn arm(&self) {
        let mut armed = self.armed.lock();
        if armed.is_some() {
            return;
        }

        // SAFETY: fd is a live inotify descriptor and path is NUL terminated
        let wd = unsafe {
            libc::inotify_add_watch(self.fd.as_raw_fd(), self.path.as_ptr(), WATCH_MASK)
        };
        if wd < 0 {
            let code = os_code(&io::Error::last_os_error());
            debug!(errno = code, "inotify_add_watch failed");
            self.park_error(code);
            return;
        }

        trace!(wd, "watch armed");
        *armed = Some(wd);
        self.current.store(wd, Ordering::Release);
    }

    fn disarm(&self) {
        let mut armed = self.armed.lock();
        if let Some(wd) = armed.take() {
            self.current.store(NO_WATCH, Ordering::Release);
            // SAFETY: plain syscall on a descriptor we own. EINVAL just means
            // the kernel already dropped the watch (directory removed).
            let rc = unsafe { libc::inotify_rm_watch(self.fd.as_raw_fd(), wd as _) };
            if rc < 0 {
                trace!(wd, errno = os_code(&io::Error::last_os_error()), "inotify_rm_watch failed");
            } else {
                trace!(wd, "watch disarmed");
            }
        }
    }

    fn cancel(&self) {
        if let Err(e) = self.waker.wake() {
            warn!("Failed to wake inotify poll: {}", e);
        }
    }
}

/// inotify source for a single directory
pub struct InotifySource {
    control: Arc<InotifyControl>,
    poll: Poll,
    events: Events,
}

impl InotifySource {
    /// Acquire the inotify descriptor, poller and waker for `path`
    ///
    /// The watch itself is added on the first [`SourceControl::arm`].
    pub fn open(path: &Path) -> Result<Self> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| Error::io(path, io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        // SAFETY: no pointers involved
        let raw = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
        if raw < 0 {
            return Err(Error::io(path, io::Error::last_os_error()));
        }
        // SAFETY: raw is a fresh descriptor nobody else owns
        let fd = unsafe { File::from_raw_fd(raw) };

        let poll = Poll::new().map_err(|e| Error::io(path, e))?;
        poll.registry()
            .register(&mut SourceFd(&raw), INOTIFY, Interest::READABLE)
            .map_err(|e| Error::io(path, e))?;
        let waker = Waker::new(poll.registry(), WAKE).map_err(|e| Error::io(path, e))?;

        Ok(Self {
            control: Arc::new(InotifyControl {
                fd,
                path: c_path,
                armed: Mutex::new(None),
                current: AtomicI32::new(NO_WATCH),
                arm_error: AtomicI32::new(0),
                waker,
            }),
            poll,
            events: Events::with_capacity(8),
        })
    }

    /// Act on records that concern the watch itself
    fn inspect(&self, buf: &[u8]) {
        let current = self.control.current.load(Ordering::Acquire);
        for record in InotifyRecords::new(buf) {
            if record.raw & libc::IN_Q_OVERFLOW != 0 {
                warn!("inotify queue overflowed; events were lost");
            } else if record.raw & WATCH_REMOVED != 0 && record.watch == Some(current) {
                debug!(wd = current, "watched directory is gone");
                self.control.park_error(libc::ENOENT);
            }
        }
    }
}

impl NotifySource for InotifySource {
    fn wait(&mut self, buf: &mut [u8]) -> std::result::Result<usize, WaitError> {
        loop {
            let parked = self.control.arm_error.load(Ordering::Acquire);
            if parked != 0 {
                return Err(WaitError::Os(parked));
            }

            // Always drain before polling: readiness is edge triggered
            match (&self.control.fd).read(buf) {
                Ok(0) => {}
                Ok(n) => {
                    self.inspect(&buf[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(WaitError::Os(os_code(&e))),
            }

            if let Err(e) = self.poll.poll(&mut self.events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(WaitError::Os(os_code(&e)));
            }

            if self.events.iter().any(|event| event.token() == WAKE) {
                return Err(WaitError::Cancelled);
            }
        }
    }

    fn records<'a>(&self, buf: &'a [u8]) -> Records<'a> {
        let current = self.control.current.load(Ordering::Acquire);
        Box::new(InotifyRecords::new(buf).filter(move |record| {
            record.raw & WATCH_RECORDS == 0 && record.watch == Some(current)
        }))
    }

    fn control(&self) -> Arc<dyn SourceControl> {
        self.control.clone()
    }
}
