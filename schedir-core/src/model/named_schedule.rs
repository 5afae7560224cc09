//! Top-level tracked schedules (a group, a lecturer, a room, or a custom one).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Group,
    Lecturer,
    Room,
    Custom,
}

impl ScheduleKind {
    /// Whether schedules of this kind are fetched from the remote source.
    pub fn is_remote(&self) -> bool {
        match self {
            ScheduleKind::Group | ScheduleKind::Lecturer | ScheduleKind::Room => true,
            ScheduleKind::Custom => false,
        }
    }

    /// Kinds an event of this schedule can link to ("open related schedule").
    ///
    /// A group's events link to their lecturers and rooms, a lecturer's to
    /// groups and rooms, and so on. Custom schedules link to everything.
    pub fn related_kinds(&self) -> &'static [ScheduleKind] {
        match self {
            ScheduleKind::Group => &[ScheduleKind::Lecturer, ScheduleKind::Room],
            ScheduleKind::Lecturer => &[ScheduleKind::Group, ScheduleKind::Room],
            ScheduleKind::Room => &[ScheduleKind::Group, ScheduleKind::Lecturer],
            ScheduleKind::Custom => &[
                ScheduleKind::Group,
                ScheduleKind::Lecturer,
                ScheduleKind::Room,
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScheduleKind::Group => "group",
            ScheduleKind::Lecturer => "lecturer",
            ScheduleKind::Room => "room",
            ScheduleKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "group" => Ok(ScheduleKind::Group),
            "lecturer" | "teacher" => Ok(ScheduleKind::Lecturer),
            "room" | "classroom" => Ok(ScheduleKind::Room),
            "custom" => Ok(ScheduleKind::Custom),
            other => Err(format!(
                "Unknown schedule kind '{}'. Expected group, lecturer, room or custom",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// External key; `None` for user-created schedules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
    pub kind: ScheduleKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl NamedSchedule {
    pub fn new(kind: ScheduleKind, name: &str, api_id: Option<&str>) -> Self {
        NamedSchedule {
            id: None,
            api_id: api_id.map(String::from),
            kind,
            name: name.to_string(),
            full_name: None,
            is_default: false,
            last_synced_at: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Display for NamedSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.display_name(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_custom_is_local() {
        assert!(ScheduleKind::Group.is_remote());
        assert!(ScheduleKind::Lecturer.is_remote());
        assert!(ScheduleKind::Room.is_remote());
        assert!(!ScheduleKind::Custom.is_remote());
    }

    #[test]
    fn related_kinds_exclude_self_for_remote_kinds() {
        for kind in [ScheduleKind::Group, ScheduleKind::Lecturer, ScheduleKind::Room] {
            assert!(!kind.related_kinds().contains(&kind));
        }
    }

    #[test]
    fn parses_kind_aliases() {
        assert_eq!("Teacher".parse::<ScheduleKind>(), Ok(ScheduleKind::Lecturer));
        assert_eq!("room".parse::<ScheduleKind>(), Ok(ScheduleKind::Room));
        assert!("planet".parse::<ScheduleKind>().is_err());
    }
}
