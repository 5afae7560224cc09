//! Date-ranged sub-schedules and their recurrence descriptor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{SchedirError, SchedirResult};
use crate::recurrence::cycle_index_of;

/// Repeating multi-week cycle of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub first_cycle_offset: u32,
    pub cycle_length: u32,
}

impl Recurrence {
    pub fn new(first_cycle_offset: u32, cycle_length: u32) -> SchedirResult<Self> {
        if cycle_length == 0 {
            return Err(SchedirError::InvalidSchedule(
                "cycle length must be at least 1".into(),
            ));
        }
        Ok(Recurrence {
            first_cycle_offset,
            cycle_length,
        })
    }

    /// A plain weekly schedule (every week looks the same).
    pub fn weekly() -> Self {
        Recurrence {
            first_cycle_offset: 0,
            cycle_length: 1,
        }
    }

    pub fn cycle_index_of(&self, date: NaiveDate, schedule_start: NaiveDate) -> u32 {
        cycle_index_of(
            date,
            schedule_start,
            self.first_cycle_offset,
            self.cycle_length,
        )
    }
}

/// One date-ranged, possibly recurring timetable of a named schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_schedule_id: Option<i64>,
    /// External key used to match this schedule across re-fetches
    pub timetable_id: String,
    pub start_date: NaiveDate,
    /// Inclusive
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl Schedule {
    pub fn new(
        timetable_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        recurrence: Option<Recurrence>,
    ) -> SchedirResult<Self> {
        let schedule = Schedule {
            id: None,
            named_schedule_id: None,
            timetable_id: timetable_id.to_string(),
            start_date,
            end_date,
            is_default: false,
            recurrence,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Check the invariants a deserialized schedule may have skipped.
    pub fn validate(&self) -> SchedirResult<()> {
        if self.start_date > self.end_date {
            return Err(SchedirError::InvalidSchedule(format!(
                "timetable '{}' ends ({}) before it starts ({})",
                self.timetable_id, self.end_date, self.start_date
            )));
        }
        if let Some(recurrence) = &self.recurrence {
            Recurrence::new(recurrence.first_cycle_offset, recurrence.cycle_length)?;
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }

    /// Can an event with `cycle_index` ever show up in this schedule?
    pub fn check_cycle_index(&self, cycle_index: Option<u32>) -> SchedirResult<()> {
        let Some(cycle) = cycle_index else {
            return Ok(());
        };
        match &self.recurrence {
            Some(r) if (1..=r.cycle_length).contains(&cycle) => Ok(()),
            Some(r) => Err(SchedirError::InvalidSchedule(format!(
                "week {cycle} is outside the {}-week cycle of timetable '{}'",
                r.cycle_length, self.timetable_id
            ))),
            None => Err(SchedirError::InvalidSchedule(format!(
                "timetable '{}' does not repeat, events cannot be bound to a cycle week",
                self.timetable_id
            ))),
        }
    }

    /// Cycle index of `date`, or `None` for schedules bound to absolute dates.
    pub fn cycle_index_of(&self, date: NaiveDate) -> Option<u32> {
        self.recurrence
            .map(|r| r.cycle_index_of(date, self.start_date))
    }
}
