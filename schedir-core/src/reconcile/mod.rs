//! Reconciliation of freshly fetched schedules with the stored copy.
//!
//! The remote source assigns no durable event ids, so an event is recognised
//! across fetches purely by its content ([`crate::model::EventKey`]). The
//! engine hands each recognised event its previous local id, which keeps user
//! annotations attached, and refuses to guess when that mapping is ambiguous.

mod change_kind;
mod schedule_merge;
mod sync_plan;

pub use change_kind::ScheduleChangeKind;
pub use schedule_merge::{ScheduleChange, reconcile_schedule};
pub use sync_plan::{SyncPlan, SyncStats, reconcile_named};

use thiserror::Error;

/// The fetched data cannot be mapped onto the stored data one-to-one.
///
/// Only possible when stored or fetched data already contains duplicates;
/// the merge is rejected and the store left as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmbiguousMerge {
    #[error("Ambiguous merge: event '{event}' in timetable '{timetable_id}' matches more than one stored event")]
    SharedIdentity { timetable_id: String, event: String },

    #[error("Ambiguous merge: timetable '{0}' appears more than once in the fetched data")]
    DuplicateTimetable(String),
}
