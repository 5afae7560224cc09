//! Schedule event templates and their structural identity.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{SchedirError, SchedirResult};
use crate::model::ScheduleKind;

/// A reference from an event to another trackable schedule
/// (the room it takes place in, a lecturer, a student group).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleLink {
    pub name: String,
    /// External key of the linked schedule, when the source exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
}

impl ScheduleLink {
    pub fn new(name: &str) -> Self {
        ScheduleLink {
            name: name.to_string(),
            api_id: None,
        }
    }
}

pub type Room = ScheduleLink;
pub type Lecturer = ScheduleLink;
pub type Group = ScheduleLink;

/// One class/meeting template within a schedule.
///
/// Periodic templates carry a `cycle_index` and repeat on the weekday of
/// `start` (in viewer-local time) in every matching cycle week. Templates
/// without a cycle index are bound to the local date of `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Local storage id; `None` until persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub type_label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot_label: Option<String>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub lecturers: Vec<Lecturer>,
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Created locally by the user, never fetched
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_index: Option<u32>,
}

impl Event {
    pub fn new(
        name: &str,
        type_label: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedirResult<Self> {
        let event = Event {
            id: None,
            name: name.to_string(),
            type_label: type_label.to_string(),
            start,
            end,
            time_slot_label: None,
            rooms: Vec::new(),
            lecturers: Vec::new(),
            groups: Vec::new(),
            is_custom: false,
            is_hidden: false,
            cycle_index: None,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> SchedirResult<()> {
        if self.start >= self.end {
            return Err(SchedirError::InvalidSchedule(format!(
                "Event '{}' ends before it starts ({} >= {})",
                self.name, self.start, self.end
            )));
        }
        Ok(())
    }

    /// A copy without local state (storage id, custom and hidden flags).
    /// Remote data never carries any.
    pub fn as_fetched(&self) -> Event {
        Event {
            id: None,
            is_custom: false,
            is_hidden: false,
            ..self.clone()
        }
    }

    pub fn links(&self, kind: ScheduleKind) -> &[ScheduleLink] {
        match kind {
            ScheduleKind::Room => self.rooms.as_slice(),
            ScheduleKind::Lecturer => self.lecturers.as_slice(),
            ScheduleKind::Group => self.groups.as_slice(),
            ScheduleKind::Custom => &[],
        }
    }

    /// Linked schedules that can be opened from a schedule of kind `from`.
    /// Links without an external key lead nowhere and are skipped.
    pub fn related_links(&self, from: ScheduleKind) -> Vec<(ScheduleKind, &ScheduleLink)> {
        from.related_kinds()
            .iter()
            .flat_map(|&kind| {
                self.links(kind)
                    .iter()
                    .filter(|link| link.api_id.is_some())
                    .map(move |link| (kind, link))
            })
            .collect()
    }

    pub fn is_periodic(&self) -> bool {
        self.cycle_index.is_some()
    }

    /// Structural identity used to recognise the same event across fetches.
    pub fn key(&self) -> EventKey {
        EventKey::of(self)
    }

    /// A copy of this event carrying another storage id.
    pub fn with_id(&self, id: Option<i64>) -> Event {
        Event {
            id,
            ..self.clone()
        }
    }

    pub fn local_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.start.with_timezone(tz).date_naive()
    }

    /// Weekday the template was authored against.
    pub fn weekday<Tz: TimeZone>(&self, tz: &Tz) -> Weekday {
        self.start.with_timezone(tz).weekday()
    }

    pub fn local_start_time<Tz: TimeZone>(&self, tz: &Tz) -> NaiveTime {
        self.start.with_timezone(tz).time()
    }

    pub fn local_end_time<Tz: TimeZone>(&self, tz: &Tz) -> NaiveTime {
        self.end.with_timezone(tz).time()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.type_label.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.type_label)
        }
    }
}

/// Every displayable field of an [`Event`] except its storage id and the
/// user-controlled hidden flag. Rooms, lecturers and groups are compared as
/// sets, so a reordered list is still the same event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    name: String,
    type_label: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    time_slot_label: Option<String>,
    rooms: Vec<Room>,
    lecturers: Vec<Lecturer>,
    groups: Vec<Group>,
    is_custom: bool,
    cycle_index: Option<u32>,
}

impl EventKey {
    fn of(event: &Event) -> Self {
        EventKey {
            name: event.name.clone(),
            type_label: event.type_label.clone(),
            start: event.start,
            end: event.end,
            time_slot_label: event.time_slot_label.clone(),
            rooms: sorted(&event.rooms),
            lecturers: sorted(&event.lecturers),
            groups: sorted(&event.groups),
            is_custom: event.is_custom,
            cycle_index: event.cycle_index,
        }
    }
}

fn sorted(links: &[ScheduleLink]) -> Vec<ScheduleLink> {
    let mut links = links.to_vec();
    links.sort();
    links.dedup();
    links
}
