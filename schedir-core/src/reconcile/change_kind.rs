use std::fmt;

use serde::{Deserialize, Serialize};

/// What a sync does to one stored schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleChangeKind {
    /// New timetable, stored as fetched
    Insert,
    /// Fetched content equals the stored content
    Unchanged,
    /// Stored row replaced by the merge, ids kept for matching events
    Update,
    /// Missing from the fetch and already over
    Delete,
    /// Missing from the fetch but not over yet, kept as is
    Retain,
}

impl ScheduleChangeKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            ScheduleChangeKind::Insert => "+",
            ScheduleChangeKind::Unchanged => "=",
            ScheduleChangeKind::Update => "~",
            ScheduleChangeKind::Delete => "-",
            ScheduleChangeKind::Retain => "?",
        }
    }

    /// Whether applying this change touches the store.
    pub fn writes(&self) -> bool {
        matches!(
            self,
            ScheduleChangeKind::Insert | ScheduleChangeKind::Update | ScheduleChangeKind::Delete
        )
    }
}

impl fmt::Display for ScheduleChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
