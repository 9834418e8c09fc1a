//! Raw records to typed events
//!
//! The translator materializes at most `capacity` events per buffer. Records
//! past that point are counted but not decoded, so a [`Batch`] always knows
//! how many records the buffer held versus how many it carries.

use crate::error::TranslateError;
use crate::event::Event;
use crate::record::RawRecord;
use crate::Result;

/// Default number of events materialized per buffer
pub const DEFAULT_BATCH_CAPACITY: usize = 256;

/// Events produced from one notification buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    events: Vec<Event>,
    total: usize,
}

impl Batch {
    /// Events in record order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Iterate events in record order
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Number of events carried by this batch
    pub fn materialized(&self) -> usize {
        self.events.len()
    }

    /// Number of records the buffer held
    pub fn total(&self) -> usize {
        self.total
    }

    /// Records left out because the batch was full
    pub fn dropped(&self) -> usize {
        self.total - self.events.len()
    }

    /// Whether records were left out
    pub fn is_truncated(&self) -> bool {
        self.dropped() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Bounded record-to-event translator
#[derive(Debug, Clone, Copy)]
pub struct Translator {
    capacity: usize,
}

impl Translator {
    /// Create a translator materializing at most `capacity` events per batch
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Translate a record chain into a batch
    ///
    /// Record order is preserved and unknown actions are kept as
    /// [`EventKind::None`](crate::EventKind::None). If any materialized
    /// record's name fails to re-encode, the whole batch is discarded.
    pub fn translate<'a, I>(&self, records: I) -> Result<Batch>
    where
        I: IntoIterator<Item = RawRecord<'a>>,
    {
        let mut events = Vec::new();
        let mut total = 0;

        for record in records {
            if total < self.capacity {
                let name = record
                    .name
                    .to_utf8()
                    .ok_or(TranslateError::Encoding { index: total })?;
                events.push(Event::new(record.kind, name));
            }
            total += 1;
        }

        Ok(Batch { events, total })
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::record::inotify_mask::*;
    use crate::record::tests::{push_inotify, win32_buffer};
    use crate::record::{file_action, InotifyRecords, Win32Records};

    #[test]
    fn test_translate_preserves_order() {
        let mut buf = Vec::new();
        push_inotify(&mut buf, 1, IN_CREATE, b"a");
        push_inotify(&mut buf, 1, IN_MODIFY, b"a");
        push_inotify(&mut buf, 1, IN_MOVED_FROM, b"a");
        push_inotify(&mut buf, 1, IN_MOVED_TO, b"b");
        push_inotify(&mut buf, 1, IN_DELETE, b"b");

        let batch = Translator::default().translate(InotifyRecords::new(&buf)).unwrap();
        let seen: Vec<_> = batch.iter().map(|e| (e.kind, e.name.as_str())).collect();
        assert_eq!(
            seen,
            vec![
                (EventKind::Added, "a"),
                (EventKind::Modified, "a"),
                (EventKind::RenamedFrom, "a"),
                (EventKind::RenamedTo, "b"),
                (EventKind::Removed, "b"),
            ]
        );
        assert!(!batch.is_truncated());
    }

    #[test]
    fn test_unknown_actions_are_delivered_as_none() {
        let buf = win32_buffer(&[
            (file_action::ADDED, "x".encode_utf16().collect()),
            (99, "y".encode_utf16().collect()),
            (file_action::REMOVED, "z".encode_utf16().collect()),
        ]);

        let batch = Translator::default().translate(Win32Records::new(&buf)).unwrap();
        assert_eq!(batch.materialized(), 3);
        assert_eq!(batch.events()[1], Event::new(EventKind::None, "y"));
    }

    #[test]
    fn test_encoding_failure_discards_whole_batch() {
        let mut buf = Vec::new();
        push_inotify(&mut buf, 1, IN_CREATE, b"fine");
        push_inotify(&mut buf, 1, IN_CREATE, b"bad\xff");
        push_inotify(&mut buf, 1, IN_CREATE, b"never-seen");

        let result = Translator::default().translate(InotifyRecords::new(&buf));
        assert_eq!(result, Err(TranslateError::Encoding { index: 1 }));
    }

    #[test]
    fn test_capacity_truncates_and_reports_total() {
        let mut buf = Vec::new();
        for i in 0..10 {
            push_inotify(&mut buf, 1, IN_CREATE, format!("f{i}").as_bytes());
        }

        let batch = Translator::new(4).translate(InotifyRecords::new(&buf)).unwrap();
        assert_eq!(batch.materialized(), 4);
        assert_eq!(batch.total(), 10);
        assert_eq!(batch.dropped(), 6);
        assert!(batch.is_truncated());
        assert_eq!(batch.events()[3].name, "f3");
    }

    #[test]
    fn test_records_past_capacity_are_not_decoded() {
        let mut buf = Vec::new();
        push_inotify(&mut buf, 1, IN_CREATE, b"kept");
        push_inotify(&mut buf, 1, IN_CREATE, b"bad\xff");

        // The bad name sits beyond capacity, so the batch survives
        let batch = Translator::new(1).translate(InotifyRecords::new(&buf)).unwrap();
        assert_eq!(batch.materialized(), 1);
        assert_eq!(batch.total(), 2);
    }

    #[test]
    fn test_empty_buffer_gives_empty_batch() {
        let batch = Translator::default().translate(InotifyRecords::new(&[])).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.total(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(Translator::new(0).capacity(), 1);
    }
}
