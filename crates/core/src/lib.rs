//! Dirwatch Core - event model and raw notification decoding
//!
//! This crate provides the platform-independent half of dirwatch:
//! - Typed notification events and kinds
//! - The error taxonomy and OS error code mapping
//! - Decoders for raw notification buffers (inotify and Win32 layouts)
//! - The bounded event translator

pub mod error;
pub mod event;
pub mod record;
pub mod translate;

// Re-export main types for convenience
pub use error::{ErrorKind, TranslateError};
pub use event::{Event, EventKind};
pub use record::{InotifyRecords, RawName, RawRecord, Win32Records};
pub use translate::{Batch, Translator};

/// Common result type used throughout dirwatch-core
pub type Result<T> = std::result::Result<T, TranslateError>;
