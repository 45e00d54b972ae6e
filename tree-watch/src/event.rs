//! Change events and the raw notifications they are built from.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A change delivered to the listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The kind of change.
    pub kind: ChangeKind,

    /// Absolute path of the affected entry.
    pub path: PathBuf,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Path of the affected entry.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Kind of delivered change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Entry was created.
    Created,

    /// Entry was modified.
    Modified,
}

impl ChangeKind {
    /// Name passed to listeners.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Modified => "Modified",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a notification reported by a watch backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// An entry appeared in the directory.
    Created,

    /// An entry in the directory changed.
    Modified,

    /// The backend lost notifications for the directory.
    Overflow,
}

impl RawKind {
    /// The delivered kind, if this notification produces an event at all.
    pub fn change_kind(self) -> Option<ChangeKind> {
        match self {
            Self::Created => Some(ChangeKind::Created),
            Self::Modified => Some(ChangeKind::Modified),
            Self::Overflow => None,
        }
    }
}

/// A pending notification for one watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    /// What happened.
    pub kind: RawKind,

    /// Entry name relative to the watched directory. `None` for overflow.
    pub name: Option<OsString>,
}

impl RawNotification {
    /// An entry was created.
    pub fn created(name: impl Into<OsString>) -> Self {
        Self {
            kind: RawKind::Created,
            name: Some(name.into()),
        }
    }

    /// An entry was modified.
    pub fn modified(name: impl Into<OsString>) -> Self {
        Self {
            kind: RawKind::Modified,
            name: Some(name.into()),
        }
    }

    /// Notifications were dropped.
    pub fn overflow() -> Self {
        Self {
            kind: RawKind::Overflow,
            name: None,
        }
    }
}

/// Receives change events on the watch worker.
///
/// Called synchronously from the dispatch loop. Long-running work here delays
/// every later event.
pub trait WatchListener: Send {
    /// Handle one change.
    fn on_watch_event(&mut self, event: &ChangeEvent);
}

impl<F> WatchListener for F
where
    F: FnMut(&ChangeEvent) + Send,
{
    fn on_watch_event(&mut self, event: &ChangeEvent) {
        self(event)
    }
}
