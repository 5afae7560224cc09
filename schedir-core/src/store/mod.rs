//! Local persistence of named schedules, schedules, events and annotations.

mod json;

pub use json::JsonStore;

use chrono::{DateTime, Utc};

use crate::error::SchedirResult;
use crate::model::{Event, NamedScheduleData, ScheduleData, StoredNamedSchedule};
use crate::reconcile::SyncPlan;

/// CRUD contract of the local store.
///
/// Operations on ids that do not exist fail with
/// [`crate::error::SchedirError::NotFound`].
pub trait LocalStore: Send {
    fn list_named_schedules(&self) -> SchedirResult<Vec<StoredNamedSchedule>>;

    fn get_named_schedule(&self, id: i64) -> SchedirResult<Option<StoredNamedSchedule>>;

    fn get_by_external_id(&self, api_id: &str) -> SchedirResult<Option<StoredNamedSchedule>>;

    /// Store a named schedule with its schedules; returns the new id.
    /// The first named schedule stored becomes the default one.
    fn insert_named_schedule(&mut self, data: NamedScheduleData) -> SchedirResult<i64>;

    /// Insert (no id) or overwrite (id set) a schedule row with its events.
    ///
    /// Events without an id get a fresh one. Annotations of stored events
    /// that are not part of `data` any more are deleted.
    fn replace_schedule(&mut self, named_schedule_id: i64, data: ScheduleData) -> SchedirResult<i64>;

    fn delete_schedule(&mut self, schedule_id: i64, also_delete_annotations: bool) -> SchedirResult<()>;

    /// Remove a named schedule with everything it owns.
    fn delete_named_schedule(&mut self, id: i64) -> SchedirResult<()>;

    /// Set or clear (empty comment, tag 0) the annotation of an event.
    fn upsert_annotation(
        &mut self,
        schedule_id: i64,
        event_id: i64,
        comment: &str,
        tag: u32,
    ) -> SchedirResult<()>;

    fn set_event_hidden(&mut self, schedule_id: i64, event_id: i64, hidden: bool) -> SchedirResult<()>;

    /// Add a locally created event; returns its id.
    fn insert_custom_event(&mut self, schedule_id: i64, event: Event) -> SchedirResult<i64>;

    fn set_default_named_schedule(&mut self, id: i64) -> SchedirResult<()>;

    fn set_default_schedule(&mut self, schedule_id: i64, named_schedule_id: i64) -> SchedirResult<()>;

    fn count_stored_named_schedules(&self) -> SchedirResult<usize>;

    /// Apply a whole reconciliation plan. Either everything applies or nothing does.
    fn apply_sync(
        &mut self,
        named_schedule_id: i64,
        plan: &SyncPlan,
        synced_at: DateTime<Utc>,
    ) -> SchedirResult<()>;
}
