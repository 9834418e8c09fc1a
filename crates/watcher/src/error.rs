//! Errors returned when opening and configuring targets

use dirwatch_core::ErrorKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to open or configure a watch target
#[derive(Debug, Error)]
pub enum Error {
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to acquire watch resources for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("directory watching is not supported on this platform")]
    Unsupported,
}

impl Error {
    /// Classify the failure in the target error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::NotADirectory(_) => ErrorKind::TargetNotSupported,
            Error::Io { source, .. } | Error::Spawn(source) => source
                .raw_os_error()
                .map(ErrorKind::from_os_code)
                .unwrap_or(ErrorKind::UnknownOs),
            Error::InvalidConfig(_) | Error::Config(_) => ErrorKind::UnknownInternal,
            Error::Unsupported => ErrorKind::TargetNotSupported,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for target operations
pub type Result<T> = std::result::Result<T, Error>;
