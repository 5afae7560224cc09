//! Schedule data model.
//!
//! A [`NamedSchedule`] owns several date-ranged [`Schedule`]s, each holding
//! the [`Event`] templates for its period. The bundle types below are the
//! shapes that travel between the fetcher, the reconciliation engine and
//! the store.

mod event;
mod named_schedule;
mod schedule;

pub use event::{Event, EventKey, Group, Lecturer, Room, ScheduleLink};
pub use named_schedule::{NamedSchedule, ScheduleKind};
pub use schedule::{Recurrence, Schedule};

use serde::{Deserialize, Serialize};

use crate::annotation::EventExtraData;

/// A schedule with its events, as fetched or as produced by a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleData {
    pub schedule: Schedule,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A schedule as persisted locally, with its user annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSchedule {
    pub schedule: Schedule,
    pub events: Vec<Event>,
    pub annotations: Vec<EventExtraData>,
}

impl StoredSchedule {
    pub fn id(&self) -> Option<i64> {
        self.schedule.id
    }

    pub fn event(&self, event_id: i64) -> Option<&Event> {
        self.events.iter().find(|e| e.id == Some(event_id))
    }
}

/// Result of fetching one named schedule from the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedScheduleData {
    pub named: NamedSchedule,
    #[serde(default)]
    pub schedules: Vec<ScheduleData>,
}

/// A named schedule as persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNamedSchedule {
    pub named: NamedSchedule,
    pub schedules: Vec<StoredSchedule>,
}

impl StoredNamedSchedule {
    pub fn id(&self) -> Option<i64> {
        self.named.id
    }

    /// The selected sub-schedule (falls back to the first one).
    pub fn default_schedule(&self) -> Option<&StoredSchedule> {
        self.schedules
            .iter()
            .find(|s| s.schedule.is_default)
            .or_else(|| self.schedules.first())
    }

    pub fn schedule(&self, schedule_id: i64) -> Option<&StoredSchedule> {
        self.schedules.iter().find(|s| s.id() == Some(schedule_id))
    }

    /// Find the schedule owning `event_id`.
    pub fn schedule_of_event(&self, event_id: i64) -> Option<&StoredSchedule> {
        self.schedules.iter().find(|s| s.event(event_id).is_some())
    }
}

impl From<NamedScheduleData> for StoredNamedSchedule {
    /// An unsaved preview of fetched data (no ids, no annotations).
    fn from(data: NamedScheduleData) -> Self {
        StoredNamedSchedule {
            named: data.named,
            schedules: data
                .schedules
                .into_iter()
                .map(|s| StoredSchedule {
                    schedule: s.schedule,
                    events: s.events,
                    annotations: Vec::new(),
                })
                .collect(),
        }
    }
}
