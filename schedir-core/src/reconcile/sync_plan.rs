//! Named-schedule level reconciliation: one plan covering every timetable.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::model::{ScheduleData, StoredSchedule};
use crate::reconcile::{AmbiguousMerge, ScheduleChange, ScheduleChangeKind, reconcile_schedule};

/// Everything a sync will do to one named schedule, computed up front so it
/// can be applied in a single store transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub changes: Vec<ScheduleChange>,
    /// Timetable that should be the selected one after applying
    pub default_timetable: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub retained: usize,
    pub events_added: usize,
    pub events_dropped: usize,
}

impl SyncStats {
    pub fn has_changes(&self) -> bool {
        self.inserted > 0 || self.updated > 0 || self.deleted > 0
    }
}

impl SyncPlan {
    pub fn stats(&self) -> SyncStats {
        let mut stats = SyncStats::default();

        for change in &self.changes {
            match change.kind {
                ScheduleChangeKind::Insert => stats.inserted += 1,
                ScheduleChangeKind::Update => stats.updated += 1,
                ScheduleChangeKind::Unchanged => stats.unchanged += 1,
                ScheduleChangeKind::Delete => stats.deleted += 1,
                ScheduleChangeKind::Retain => stats.retained += 1,
            }
            stats.events_added += change.added_events();
            stats.events_dropped += change.dropped_event_ids.len();
        }

        stats
    }

    /// True when applying the plan would only refresh the sync timestamp.
    pub fn is_noop(&self) -> bool {
        let default_kept = self.changes.iter().any(|c| {
            c.schedule.is_default && Some(c.timetable_id()) == self.default_timetable.as_deref()
        });
        default_kept && !self.changes.iter().any(|c| c.kind.writes())
    }

    pub fn change(&self, timetable_id: &str) -> Option<&ScheduleChange> {
        self.changes.iter().find(|c| c.timetable_id() == timetable_id)
    }
}

/// Reconcile every fetched timetable of a named schedule against `stored`.
///
/// Stored timetables missing from the fetch are deleted once their end date
/// has passed, and retained untouched otherwise. Fails as a whole if any
/// single timetable merge is ambiguous.
pub fn reconcile_named(
    stored: &[StoredSchedule],
    fetched: Vec<ScheduleData>,
    today: NaiveDate,
) -> Result<SyncPlan, AmbiguousMerge> {
    let stored_by_timetable: HashMap<&str, &StoredSchedule> = stored
        .iter()
        .map(|s| (s.schedule.timetable_id.as_str(), s))
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut changes = Vec::with_capacity(fetched.len());

    for data in fetched {
        let timetable_id = data.schedule.timetable_id.clone();
        if !seen.insert(timetable_id.clone()) {
            return Err(AmbiguousMerge::DuplicateTimetable(timetable_id));
        }

        let old = stored_by_timetable.get(timetable_id.as_str()).copied();
        changes.push(reconcile_schedule(old, data)?);
    }

    changes.extend(
        stored
            .iter()
            .filter(|s| !seen.contains(&s.schedule.timetable_id))
            .map(|s| ScheduleChange::unconfirmed(s, today)),
    );

    let default_timetable = pick_default(&changes, today);

    Ok(SyncPlan {
        changes,
        default_timetable,
    })
}

/// Keep the current default if it survives; otherwise prefer the timetable
/// running today, then the one starting last.
fn pick_default(changes: &[ScheduleChange], today: NaiveDate) -> Option<String> {
    let survivors: Vec<&ScheduleChange> = changes
        .iter()
        .filter(|c| c.kind != ScheduleChangeKind::Delete)
        .collect();

    survivors
        .iter()
        .find(|c| c.schedule.is_default)
        .or_else(|| survivors.iter().find(|c| c.schedule.contains(today)))
        .or_else(|| survivors.iter().max_by_key(|c| c.schedule.start_date))
        .map(|c| c.timetable_id().to_string())
}
