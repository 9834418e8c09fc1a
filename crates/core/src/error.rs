//! Error taxonomy for watch targets

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Caller-facing classification of a target's state
///
/// The integer codes returned by [`ErrorKind::code`] are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The handle does not name a live target
    InvalidTarget,
    /// No error recorded
    Success,
    /// Library or kernel bookkeeping failure
    UnknownInternal,
    /// The path cannot be watched on this platform or filesystem
    TargetNotSupported,
    /// Permission to watch the directory was denied
    AccessDenied,
    /// Out of memory, handles or watches
    MemoryExhausted,
    /// An OS error with no closer classification
    UnknownOs,
}

impl ErrorKind {
    /// Stable integer code
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::InvalidTarget => -1,
            ErrorKind::Success => 0,
            ErrorKind::UnknownInternal => 1,
            ErrorKind::TargetNotSupported => 2,
            ErrorKind::AccessDenied => 3,
            ErrorKind::MemoryExhausted => 4,
            ErrorKind::UnknownOs => 5,
        }
    }

    /// Whether this kind describes a failed target
    pub fn is_error(&self) -> bool {
        !matches!(self, ErrorKind::Success)
    }

    /// Map a raw OS error code (errno on unix) into the taxonomy
    #[cfg(unix)]
    pub fn from_os_code(code: i32) -> Self {
        match code {
            0 => ErrorKind::Success,
            libc::EACCES | libc::EPERM => ErrorKind::AccessDenied,
            libc::ENOMEM | libc::EMFILE | libc::ENFILE | libc::ENOSPC => {
                ErrorKind::MemoryExhausted
            }
            libc::ENOTDIR | libc::ENOSYS | libc::EOPNOTSUPP => ErrorKind::TargetNotSupported,
            libc::EINVAL | libc::EFAULT | libc::EBADF => ErrorKind::UnknownInternal,
            _ => ErrorKind::UnknownOs,
        }
    }

    /// Map a raw OS error code (Win32 error on windows) into the taxonomy
    #[cfg(windows)]
    pub fn from_os_code(code: i32) -> Self {
        const ERROR_INVALID_FUNCTION: i32 = 1;
        const ERROR_TOO_MANY_OPEN_FILES: i32 = 4;
        const ERROR_ACCESS_DENIED: i32 = 5;
        const ERROR_NOT_ENOUGH_MEMORY: i32 = 8;
        const ERROR_OUTOFMEMORY: i32 = 14;
        const ERROR_INVALID_PARAMETER: i32 = 87;
        const ERROR_NOACCESS: i32 = 998;
        const ERROR_NOTIFY_ENUM_DIR: i32 = 1022;

        match code {
            0 => ErrorKind::Success,
            ERROR_ACCESS_DENIED => ErrorKind::AccessDenied,
            ERROR_NOT_ENOUGH_MEMORY | ERROR_OUTOFMEMORY | ERROR_TOO_MANY_OPEN_FILES => {
                ErrorKind::MemoryExhausted
            }
            ERROR_INVALID_FUNCTION => ErrorKind::TargetNotSupported,
            ERROR_INVALID_PARAMETER | ERROR_NOACCESS | ERROR_NOTIFY_ENUM_DIR => {
                ErrorKind::UnknownInternal
            }
            _ => ErrorKind::UnknownOs,
        }
    }

    /// Map a raw OS error code into the taxonomy
    #[cfg(not(any(unix, windows)))]
    pub fn from_os_code(code: i32) -> Self {
        match code {
            0 => ErrorKind::Success,
            _ => ErrorKind::UnknownOs,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::InvalidTarget => "invalid target",
            ErrorKind::Success => "success",
            ErrorKind::UnknownInternal => "unknown internal error",
            ErrorKind::TargetNotSupported => "target not supported",
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::MemoryExhausted => "not enough memory",
            ErrorKind::UnknownOs => "unknown OS error",
        };
        f.write_str(text)
    }
}

/// Failure to turn a raw notification buffer into events
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// A record name could not be re-encoded as UTF-8
    #[error("record {index} has a name that is not valid in its native encoding")]
    Encoding {
        /// Position of the offending record in the buffer
        index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidTarget.code(), -1);
        assert_eq!(ErrorKind::Success.code(), 0);
        assert_eq!(ErrorKind::UnknownOs.code(), 5);
    }

    #[test]
    fn test_zero_is_success() {
        assert_eq!(ErrorKind::from_os_code(0), ErrorKind::Success);
        assert!(!ErrorKind::Success.is_error());
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_mapping() {
        assert_eq!(ErrorKind::from_os_code(libc::EACCES), ErrorKind::AccessDenied);
        assert_eq!(ErrorKind::from_os_code(libc::ENOSPC), ErrorKind::MemoryExhausted);
        assert_eq!(ErrorKind::from_os_code(libc::EMFILE), ErrorKind::MemoryExhausted);
        assert_eq!(ErrorKind::from_os_code(libc::ENOTDIR), ErrorKind::TargetNotSupported);
        assert_eq!(ErrorKind::from_os_code(libc::EBADF), ErrorKind::UnknownInternal);
        assert_eq!(ErrorKind::from_os_code(libc::EIO), ErrorKind::UnknownOs);
    }

    #[cfg(windows)]
    #[test]
    fn test_windows_mapping() {
        assert_eq!(ErrorKind::from_os_code(5), ErrorKind::AccessDenied);
        assert_eq!(ErrorKind::from_os_code(14), ErrorKind::MemoryExhausted);
        assert_eq!(ErrorKind::from_os_code(1), ErrorKind::TargetNotSupported);
        assert_eq!(ErrorKind::from_os_code(1022), ErrorKind::UnknownInternal);
        assert_eq!(ErrorKind::from_os_code(123), ErrorKind::UnknownOs);
    }
}
