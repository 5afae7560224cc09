//! State of the "current schedule" screen as a pure reducer.
//!
//! The facade is the only writer: every change goes through
//! [`reduce`], and the projections below are recomputed from the state on
//! demand.

use chrono::{NaiveDate, TimeZone};

use crate::annotation::{AnnotatedEvent, attach};
use crate::model::{NamedScheduleData, StoredNamedSchedule, StoredSchedule};
use crate::projection::{AgendaDay, GridProjection, project_for_grid, project_for_list};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Named schedule on screen; unsaved when its id is `None`
    pub current: Option<StoredNamedSchedule>,
    /// Explicitly picked sub-schedule, overriding the stored default
    pub selected_schedule_id: Option<i64>,
    /// Timetable picked while previewing unsaved data
    pub selected_timetable: Option<String>,
    pub syncing: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Fresh copy from the store (`None` when the store is empty)
    Loaded(Option<StoredNamedSchedule>),
    /// Fetched data that has not been saved
    Previewed(NamedScheduleData),
    SelectSchedule(i64),
    SelectTimetable(String),
    SyncStarted(i64),
    SyncFinished(StoredNamedSchedule),
    SyncFailed { named_id: i64, error: String },
}

pub fn reduce(state: ViewState, action: Action) -> ViewState {
    match action {
        Action::Loaded(current) => {
            let same = same_named(&state, current.as_ref());
            ViewState {
                selected_schedule_id: if same { state.selected_schedule_id } else { None },
                selected_timetable: None,
                syncing: same && state.syncing,
                last_error: None,
                current,
            }
        }
        Action::Previewed(data) => ViewState {
            current: Some(data.into()),
            ..ViewState::default()
        },
        Action::SelectSchedule(schedule_id) => {
            let known = state
                .current
                .as_ref()
                .is_some_and(|c| c.schedule(schedule_id).is_some());
            if !known {
                return state;
            }
            ViewState {
                selected_schedule_id: Some(schedule_id),
                ..state
            }
        }
        Action::SelectTimetable(timetable_id) => ViewState {
            selected_timetable: Some(timetable_id),
            ..state
        },
        Action::SyncStarted(named_id) if is_current(&state, named_id) => ViewState {
            syncing: true,
            last_error: None,
            ..state
        },
        Action::SyncFinished(stored) if stored.id().is_some_and(|id| is_current(&state, id)) => {
            let selected_schedule_id = state
                .selected_schedule_id
                .filter(|id| stored.schedule(*id).is_some());
            ViewState {
                current: Some(stored),
                selected_schedule_id,
                syncing: false,
                ..state
            }
        }
        Action::SyncFailed { named_id, error } if is_current(&state, named_id) => ViewState {
            syncing: false,
            last_error: Some(error),
            ..state
        },
        Action::SyncStarted(_) | Action::SyncFinished(_) | Action::SyncFailed { .. } => state,
    }
}

fn is_current(state: &ViewState, named_id: i64) -> bool {
    state
        .current
        .as_ref()
        .is_some_and(|c| c.id() == Some(named_id))
}

fn same_named(state: &ViewState, next: Option<&StoredNamedSchedule>) -> bool {
    match (state.current.as_ref().and_then(|c| c.id()), next.and_then(|n| n.id())) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl ViewState {
    pub fn is_saved(&self) -> bool {
        self.current_id().is_some()
    }

    pub fn current_id(&self) -> Option<i64> {
        self.current.as_ref().and_then(|c| c.id())
    }

    /// Sub-schedule on screen: the explicit pick, else the stored default.
    pub fn schedule(&self) -> Option<&StoredSchedule> {
        let current = self.current.as_ref()?;

        self.selected_schedule_id
            .and_then(|id| current.schedule(id))
            .or_else(|| {
                let timetable = self.selected_timetable.as_deref()?;
                current
                    .schedules
                    .iter()
                    .find(|s| s.schedule.timetable_id == timetable)
            })
            .or_else(|| current.default_schedule())
    }

    pub fn grid<Tz: TimeZone>(&self, tz: &Tz) -> Option<GridProjection<Tz>> {
        let schedule = self.schedule()?;
        Some(project_for_grid(&schedule.schedule, &schedule.events, tz))
    }

    pub fn agenda<Tz: TimeZone>(
        &self,
        tz: &Tz,
        reference_date: NaiveDate,
        horizon_weeks: u32,
    ) -> Vec<AgendaDay> {
        self.schedule()
            .map(|s| project_for_list(&s.schedule, &s.events, tz, reference_date, horizon_weeks))
            .unwrap_or_default()
    }

    /// Events of the on-screen schedule with their annotations.
    pub fn annotated_events(&self) -> Vec<AnnotatedEvent> {
        self.schedule()
            .map(|s| attach(s.id(), &s.events, &s.annotations))
            .unwrap_or_default()
    }
}
