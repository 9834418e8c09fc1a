//! Windows notification source backed by `ReadDirectoryChangesW`
//!
//! The directory handle is read synchronously on the worker thread and
//! cancelled from other threads with `CancelIoEx`, which makes the call fail
//! with `ERROR_OPERATION_ABORTED`.
//!
//! Windows starts buffering changes once the first read has been issued, so
//! arming and disarming are no-ops here; pause only cancels the read.

use super::{NotifySource, Records, SourceControl, WaitError};
use crate::error::{Error, Result};
use dirwatch_core::Win32Records;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::ptr;
use std::sync::Arc;
use tracing::trace;
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_OPERATION_ABORTED, HANDLE, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadDirectoryChangesW, FILE_FLAG_BACKUP_SEMANTICS, FILE_LIST_DIRECTORY,
    FILE_NOTIFY_CHANGE_DIR_NAME, FILE_NOTIFY_CHANGE_FILE_NAME, FILE_NOTIFY_CHANGE_LAST_WRITE,
    FILE_NOTIFY_CHANGE_SIZE, FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
    OPEN_EXISTING,
};
use windows_sys::Win32::System::IO::CancelIoEx;

const NOTIFY_FILTER: u32 = FILE_NOTIFY_CHANGE_DIR_NAME
    | FILE_NOTIFY_CHANGE_FILE_NAME
    | FILE_NOTIFY_CHANGE_LAST_WRITE
    | FILE_NOTIFY_CHANGE_SIZE;

/// Owned directory handle
struct DirHandle {
    handle: HANDLE,
}

impl Drop for DirHandle {
    fn drop(&mut self) {
        // SAFETY: handle came from CreateFileW and is closed exactly once
        unsafe { CloseHandle(self.handle) };
    }
}

impl SourceControl for DirHandle {
    fn arm(&self) {}

    fn disarm(&self) {}

    fn cancel(&self) {
        // SAFETY: handle is live for as long as any owner holds the Arc
        let ok = unsafe { CancelIoEx(self.handle, ptr::null()) };
        if ok == 0 {
            // ERROR_NOT_FOUND: nothing was in flight
            trace!("CancelIoEx found no outstanding read");
        }
    }
}

/// `ReadDirectoryChangesW` source for a single directory
pub struct Win32Source {
    dir: Arc<DirHandle>,
    /// DWORD aligned notification buffer
    aligned: Vec<u32>,
}

impl Win32Source {
    /// Open `path` for change notification
    pub fn open(path: &Path, buffer_size: usize) -> Result<Self> {
        let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();

        // SAFETY: wide is NUL terminated and outlives the call
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                FILE_LIST_DIRECTORY,
                FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
                ptr::null(),
                OPEN_EXISTING,
                FILE_FLAG_BACKUP_SEMANTICS,
                0,
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(Error::io(path, io::Error::last_os_error()));
        }

        Ok(Self {
            dir: Arc::new(DirHandle { handle }),
            aligned: vec![0u32; buffer_size.div_ceil(4)],
        })
    }
}

impl NotifySource for Win32Source {
    fn wait(&mut self, buf: &mut [u8]) -> std::result::Result<usize, WaitError> {
        let capacity = (self.aligned.len() * 4).min(buf.len());
        let mut returned = 0u32;

        // SAFETY: the buffer is DWORD aligned, at least `capacity` bytes and
        // exclusively borrowed for the duration of the synchronous call
        let ok = unsafe {
            ReadDirectoryChangesW(
                self.dir.handle,
                self.aligned.as_mut_ptr().cast(),
                capacity as u32,
                0,
                NOTIFY_FILTER,
                &mut returned,
                ptr::null_mut(),
                None,
            )
        };

        if ok == 0 {
            // SAFETY: no preconditions
            let code = unsafe { GetLastError() };
            if code == ERROR_OPERATION_ABORTED {
                return Err(WaitError::Cancelled);
            }
            return Err(WaitError::Os(code as i32));
        }

        let len = returned as usize;
        for (chunk, word) in buf[..len].chunks_mut(4).zip(&self.aligned) {
            chunk.copy_from_slice(&word.to_ne_bytes()[..chunk.len()]);
        }
        Ok(len)
    }

    fn records<'a>(&self, buf: &'a [u8]) -> Records<'a> {
        Box::new(Win32Records::new(buf))
    }

    fn control(&self) -> Arc<dyn SourceControl> {
        self.dir.clone()
    }
}
