//! Notification events delivered to target callbacks

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change reported for a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Record with an action outside the known table (not an error)
    None,
    /// Entry created or moved into the directory
    Added,
    /// Entry deleted
    Removed,
    /// Entry contents or size changed
    Modified,
    /// Old name of a renamed entry
    RenamedFrom,
    /// New name of a renamed entry
    RenamedTo,
}

impl EventKind {
    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::None => "<none>",
            EventKind::Added => "Added",
            EventKind::Removed => "Removed",
            EventKind::Modified => "Modified",
            EventKind::RenamedFrom => "Renamed from",
            EventKind::RenamedTo => "Renamed to",
        }
    }

    /// Whether this is half of a rename pair
    pub fn is_rename(&self) -> bool {
        matches!(self, EventKind::RenamedFrom | EventKind::RenamedTo)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single change to an entry of a watched directory
///
/// Events are owned by the worker that produced them. Callbacks receive
/// `Option<&Event>`, so an event cannot be retained past the call without
/// cloning it; `None` is reserved for "the worker failed and is terminating".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Type of change
    pub kind: EventKind,
    /// Entry name relative to the watched directory, UTF-8
    pub name: String,
}

impl Event {
    /// Create a new event
    pub fn new(kind: EventKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Type of change
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Entry name relative to the watched directory
    pub fn name(&self) -> &str {
        &self.name
    }
}
