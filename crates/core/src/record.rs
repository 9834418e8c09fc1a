//! Decoders for raw notification buffers
//!
//! Each platform hands back a byte buffer holding a chain of variable-length
//! records. The decoders here walk that chain and yield typed records that
//! still borrow their names from the buffer:
//! - [`InotifyRecords`]: length-chained `inotify_event` records (Linux)
//! - [`Win32Records`]: offset-linked `FILE_NOTIFY_INFORMATION` records (Windows)
//!
//! Both are plain byte parsers so they can be exercised on any platform.
//! A record that would run past the end of the buffer ends the chain.

use crate::event::EventKind;

/// inotify mask bits (`<sys/inotify.h>`)
pub mod inotify_mask {
    pub const IN_MODIFY: u32 = 0x0000_0002;
    pub const IN_MOVED_FROM: u32 = 0x0000_0040;
    pub const IN_MOVED_TO: u32 = 0x0000_0080;
    pub const IN_CREATE: u32 = 0x0000_0100;
    pub const IN_DELETE: u32 = 0x0000_0200;
    pub const IN_DELETE_SELF: u32 = 0x0000_0400;
    pub const IN_Q_OVERFLOW: u32 = 0x0000_4000;
    pub const IN_IGNORED: u32 = 0x0000_8000;
}

/// Win32 `FILE_ACTION_*` codes
pub mod file_action {
    pub const ADDED: u32 = 1;
    pub const REMOVED: u32 = 2;
    pub const MODIFIED: u32 = 3;
    pub const RENAMED_OLD_NAME: u32 = 4;
    pub const RENAMED_NEW_NAME: u32 = 5;
}

/// Size of the fixed `inotify_event` header
pub const INOTIFY_HEADER_LEN: usize = 16;

/// Size of the fixed `FILE_NOTIFY_INFORMATION` header
pub const WIN32_HEADER_LEN: usize = 12;

/// Entry name as stored in the raw buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawName<'a> {
    /// Byte string in the platform's narrow encoding (UTF-8 expected)
    Narrow(&'a [u8]),
    /// UTF-16LE code units, two bytes each
    Wide(&'a [u8]),
}

impl RawName<'_> {
    /// Re-encode the name as UTF-8
    ///
    /// Returns `None` for invalid UTF-8 or unpaired surrogates.
    pub fn to_utf8(&self) -> Option<String> {
        match self {
            RawName::Narrow(bytes) => std::str::from_utf8(bytes).ok().map(str::to_owned),
            RawName::Wide(bytes) => {
                if bytes.len() % 2 != 0 {
                    return None;
                }
                let units = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                char::decode_utf16(units).collect::<Result<String, _>>().ok()
            }
        }
    }

    /// Whether the name is empty
    pub fn is_empty(&self) -> bool {
        match self {
            RawName::Narrow(bytes) | RawName::Wide(bytes) => bytes.is_empty(),
        }
    }
}

/// One decoded record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// Kind from the platform's action table
    pub kind: EventKind,
    /// Entry name, still in native encoding
    pub name: RawName<'a>,
    /// Watch the record belongs to, where the platform reports one
    pub watch: Option<i32>,
    /// Untranslated inotify mask or Win32 action code
    pub raw: u32,
}

fn read_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at + 4)?;
    Some(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u32_le(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Map an inotify mask to an event kind
pub fn inotify_kind(mask: u32) -> EventKind {
    use inotify_mask::*;

    if mask & IN_CREATE != 0 {
        EventKind::Added
    } else if mask & IN_DELETE != 0 {
        EventKind::Removed
    } else if mask & IN_MODIFY != 0 {
        EventKind::Modified
    } else if mask & IN_MOVED_FROM != 0 {
        EventKind::RenamedFrom
    } else if mask & IN_MOVED_TO != 0 {
        EventKind::RenamedTo
    } else {
        EventKind::None
    }
}

/// Map a Win32 file action to an event kind
pub fn win32_kind(action: u32) -> EventKind {
    match action {
        file_action::ADDED => EventKind::Added,
        file_action::REMOVED => EventKind::Removed,
        file_action::MODIFIED => EventKind::Modified,
        file_action::RENAMED_OLD_NAME => EventKind::RenamedFrom,
        file_action::RENAMED_NEW_NAME => EventKind::RenamedTo,
        _ => EventKind::None,
    }
}

/// Iterator over `inotify_event` records
///
/// Layout per record, native endian: `wd: i32, mask: u32, cookie: u32,
/// len: u32, name: [u8; len]`. The name is NUL padded.
#[derive(Debug, Clone)]
pub struct InotifyRecords<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> InotifyRecords<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }
}

impl<'a> Iterator for InotifyRecords<'a> {
    type Item = RawRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.offset;
        let wd = read_u32(self.buf, start)? as i32;
        let mask = read_u32(self.buf, start + 4)?;
        let len = read_u32(self.buf, start + 12)? as usize;

        let name_start = start + INOTIFY_HEADER_LEN;
        let padded = self.buf.get(name_start..name_start + len)?;
        let name_len = padded.iter().position(|&b| b == 0).unwrap_or(padded.len());

        self.offset = name_start + len;

        Some(RawRecord {
            kind: inotify_kind(mask),
            name: RawName::Narrow(&padded[..name_len]),
            watch: Some(wd),
            raw: mask,
        })
    }
}

/// Iterator over `FILE_NOTIFY_INFORMATION` records
///
/// Layout per record, little endian: `next_entry_offset: u32, action: u32,
/// file_name_length: u32, file_name: [u16]`. The chain ends at a record whose
/// `next_entry_offset` is zero.
#[derive(Debug, Clone)]
pub struct Win32Records<'a> {
    buf: &'a [u8],
    offset: Option<usize>,
}

impl<'a> Win32Records<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        let offset = if buf.len() >= WIN32_HEADER_LEN { Some(0) } else { None };
        Self { buf, offset }
    }
}

impl<'a> Iterator for Win32Records<'a> {
    type Item = RawRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.offset.take()?;
        let next_entry = read_u32_le(self.buf, start)? as usize;
        let action = read_u32_le(self.buf, start + 4)?;
        let name_len = read_u32_le(self.buf, start + 8)? as usize;

        let name_start = start + WIN32_HEADER_LEN;
        let name = self.buf.get(name_start..name_start + name_len)?;

        // A zero offset terminates the chain; so does one that fails to advance
        if next_entry != 0 {
            self.offset = start.checked_add(next_entry);
        }

        Some(RawRecord {
            kind: win32_kind(action),
            name: RawName::Wide(name),
            watch: None,
            raw: action,
        })
    }
}
