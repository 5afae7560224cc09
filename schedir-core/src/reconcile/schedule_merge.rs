//! Merging one freshly fetched schedule into its stored predecessor.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;

use crate::model::{Event, EventKey, Schedule, ScheduleData, StoredSchedule};
use crate::reconcile::{AmbiguousMerge, ScheduleChangeKind};

/// The outcome for one timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleChange {
    pub kind: ScheduleChangeKind,
    /// Merged row for Insert/Update/Unchanged, the stored row for Delete/Retain
    pub schedule: Schedule,
    /// Merged events; empty for Delete and Retain, which leave stored events alone
    pub events: Vec<Event>,
    /// Stored events with no successor (their annotations go with them)
    pub dropped_event_ids: Vec<i64>,
}

impl ScheduleChange {
    pub fn timetable_id(&self) -> &str {
        &self.schedule.timetable_id
    }

    fn insert(fetched: ScheduleData) -> Self {
        ScheduleChange {
            kind: ScheduleChangeKind::Insert,
            schedule: Schedule {
                id: None,
                named_schedule_id: None,
                is_default: false,
                ..fetched.schedule
            },
            events: fetched.events,
            dropped_event_ids: Vec::new(),
        }
    }

    /// Outcome for a stored schedule that is absent from the fetch.
    pub(crate) fn unconfirmed(stored: &StoredSchedule, today: NaiveDate) -> Self {
        let (kind, dropped_event_ids) = if stored.schedule.is_expired(today) {
            let ids = stored.events.iter().filter_map(|e| e.id).collect();
            (ScheduleChangeKind::Delete, ids)
        } else {
            (ScheduleChangeKind::Retain, Vec::new())
        };

        ScheduleChange {
            kind,
            schedule: stored.schedule.clone(),
            events: Vec::new(),
            dropped_event_ids,
        }
    }

    /// Merged payload to hand to the store.
    pub fn data(&self) -> ScheduleData {
        ScheduleData {
            schedule: self.schedule.clone(),
            events: self.events.clone(),
        }
    }

    /// Number of events that will be created without a predecessor.
    pub fn added_events(&self) -> usize {
        match self.kind {
            ScheduleChangeKind::Insert | ScheduleChangeKind::Update => {
                self.events.iter().filter(|e| e.id.is_none()).count()
            }
            _ => 0,
        }
    }
}

impl fmt::Display for ScheduleChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}..{})",
            self.kind, self.schedule.timetable_id, self.schedule.start_date, self.schedule.end_date
        )
    }
}

/// Merge `fetched` into `old`.
///
/// Fetched events that are structurally identical to a stored event take over
/// its id (and hidden flag), so annotations keyed by that id stay attached.
/// Locally created events are carried over untouched. Everything else in
/// `old` is dropped.
///
/// Local state on fetched events (ids, custom and hidden flags) is ignored.
///
/// Fails without side effects when the identity mapping is not injective.
pub fn reconcile_schedule(
    old: Option<&StoredSchedule>,
    fetched: ScheduleData,
) -> Result<ScheduleChange, AmbiguousMerge> {
    let ScheduleData { schedule, events } = fetched;
    let fetched = ScheduleData {
        schedule,
        events: events.iter().map(Event::as_fetched).collect(),
    };

    let Some(old) = old else {
        return Ok(ScheduleChange::insert(fetched));
    };

    let mut by_key: HashMap<EventKey, Vec<&Event>> = HashMap::new();
    for event in old.events.iter().filter(|e| !e.is_custom && e.id.is_some()) {
        by_key.entry(event.key()).or_default().push(event);
    }

    let mut claimed: HashSet<i64> = HashSet::new();
    let mut events = Vec::with_capacity(fetched.events.len());

    for event in &fetched.events {
        let successor = match by_key.get(&event.key()).map(Vec::as_slice) {
            None | Some([]) => event.clone(),
            Some([previous]) => {
                let ambiguous = previous.id.is_none_or(|id| !claimed.insert(id));
                if ambiguous {
                    return Err(AmbiguousMerge::SharedIdentity {
                        timetable_id: fetched.schedule.timetable_id.clone(),
                        event: event.name.clone(),
                    });
                }
                Event {
                    id: previous.id,
                    is_hidden: previous.is_hidden,
                    ..event.clone()
                }
            }
            Some(_) => {
                return Err(AmbiguousMerge::SharedIdentity {
                    timetable_id: fetched.schedule.timetable_id.clone(),
                    event: event.name.clone(),
                });
            }
        };
        events.push(successor);
    }

    let all_matched = events.iter().all(|e| e.id.is_some());
    events.extend(old.events.iter().filter(|e| e.is_custom).cloned());

    let dropped_event_ids: Vec<i64> = old
        .events
        .iter()
        .filter(|e| !e.is_custom)
        .filter_map(|e| e.id)
        .filter(|id| !claimed.contains(id))
        .collect();

    let schedule = Schedule {
        id: old.schedule.id,
        named_schedule_id: old.schedule.named_schedule_id,
        is_default: old.schedule.is_default,
        ..fetched.schedule
    };

    let kind = if all_matched && dropped_event_ids.is_empty() && schedule == old.schedule {
        ScheduleChangeKind::Unchanged
    } else {
        ScheduleChangeKind::Update
    };

    Ok(ScheduleChange {
        kind,
        schedule,
        events,
        dropped_event_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::EventExtraData;
    use crate::model::{Recurrence, ScheduleLink};
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(name: &str, hour: u32) -> Event {
        let mut event = Event::new(
            name,
            "Lecture",
            Utc.with_ymd_and_hms(2025, 9, 1, hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 1, hour + 1, 30, 0).unwrap(),
        )
        .unwrap();
        event.rooms = vec![ScheduleLink::new("A-101")];
        event.cycle_index = Some(1);
        event
    }

    fn schedule() -> Schedule {
        Schedule::new(
            "tt-fall",
            date(2025, 9, 1),
            date(2025, 12, 28),
            Some(Recurrence::new(0, 2).unwrap()),
        )
        .unwrap()
    }

    fn fetched(events: Vec<Event>) -> ScheduleData {
        ScheduleData {
            schedule: schedule(),
            events,
        }
    }

    /// A stored copy of `fetched(events)` with ids 1.. and schedule id 100.
    fn stored(events: Vec<Event>) -> StoredSchedule {
        let mut schedule = schedule();
        schedule.id = Some(100);
        schedule.named_schedule_id = Some(7);
        schedule.is_default = true;

        StoredSchedule {
            schedule,
            events: events
                .into_iter()
                .enumerate()
                .map(|(i, e)| e.with_id(Some(i as i64 + 1)))
                .collect(),
            annotations: vec![EventExtraData {
                schedule_id: 100,
                event_id: 2,
                comment: "exam prep".into(),
                tag: 4,
            }],
        }
    }

    fn ids(change: &ScheduleChange) -> Vec<Option<i64>> {
        change.events.iter().map(|e| e.id).collect()
    }

    #[test]
    fn missing_predecessor_is_insert() {
        let mut with_id = event("Algebra", 9);
        with_id.id = Some(55);

        let change = reconcile_schedule(None, fetched(vec![with_id])).unwrap();

        assert_eq!(change.kind, ScheduleChangeKind::Insert);
        assert_eq!(ids(&change), vec![None]);
        assert_eq!(change.schedule.id, None);
        assert_eq!(change.added_events(), 1);
    }

    #[test]
    fn identical_fetch_keeps_ids_and_is_unchanged() {
        let events = vec![event("Algebra", 9), event("Physics", 11)];
        let old = stored(events.clone());

        let change = reconcile_schedule(Some(&old), fetched(events)).unwrap();

        assert_eq!(change.kind, ScheduleChangeKind::Unchanged);
        assert_eq!(ids(&change), vec![Some(1), Some(2)]);
        assert!(change.dropped_event_ids.is_empty());
    }

    #[test]
    fn reordered_fetch_still_matches() {
        let old = stored(vec![event("Algebra", 9), event("Physics", 11)]);

        let change =
            reconcile_schedule(Some(&old), fetched(vec![event("Physics", 11), event("Algebra", 9)]))
                .unwrap();

        assert_eq!(ids(&change), vec![Some(2), Some(1)]);
        assert_eq!(change.kind, ScheduleChangeKind::Unchanged);
    }

    #[test]
    fn changed_event_gets_new_row_and_old_is_dropped() {
        let old = stored(vec![event("Algebra", 9), event("Physics", 11)]);

        let mut moved = event("Physics", 11);
        moved.rooms = vec![ScheduleLink::new("C-303")];

        let change = reconcile_schedule(Some(&old), fetched(vec![event("Algebra", 9), moved])).unwrap();

        assert_eq!(change.kind, ScheduleChangeKind::Update);
        assert_eq!(ids(&change), vec![Some(1), None]);
        assert_eq!(change.dropped_event_ids, vec![2]);
        assert_eq!(change.added_events(), 1);
    }

    #[test]
    fn schedule_row_keeps_local_identity() {
        let old = stored(vec![event("Algebra", 9)]);

        let mut data = fetched(vec![event("Algebra", 9)]);
        data.schedule.end_date = date(2026, 1, 11);
        data.schedule.is_default = false;

        let change = reconcile_schedule(Some(&old), data).unwrap();

        assert_eq!(change.kind, ScheduleChangeKind::Update);
        assert_eq!(change.schedule.id, Some(100));
        assert_eq!(change.schedule.named_schedule_id, Some(7));
        assert!(change.schedule.is_default);
        assert_eq!(change.schedule.end_date, date(2026, 1, 11));
    }

    #[test]
    fn hidden_flag_carries_over() {
        let mut old = stored(vec![event("Algebra", 9)]);
        old.events[0].is_hidden = true;

        let change = reconcile_schedule(Some(&old), fetched(vec![event("Algebra", 9)])).unwrap();

        assert!(change.events[0].is_hidden);
        assert_eq!(change.kind, ScheduleChangeKind::Unchanged);
    }

    #[test]
    fn custom_events_survive() {
        let mut custom = event("Study group", 18);
        custom.is_custom = true;
        custom.cycle_index = None;
        let old = stored(vec![event("Algebra", 9), custom]);

        let change = reconcile_schedule(Some(&old), fetched(vec![event("Algebra", 9)])).unwrap();

        assert_eq!(change.kind, ScheduleChangeKind::Unchanged);
        assert_eq!(ids(&change), vec![Some(1), Some(2)]);
        assert!(change.events[1].is_custom);
    }

    #[test]
    fn duplicate_stored_identity_is_ambiguous() {
        let old = stored(vec![event("Algebra", 9), event("Algebra", 9)]);

        let result = reconcile_schedule(Some(&old), fetched(vec![event("Algebra", 9)]));

        assert_eq!(
            result,
            Err(AmbiguousMerge::SharedIdentity {
                timetable_id: "tt-fall".into(),
                event: "Algebra".into(),
            })
        );
    }

    #[test]
    fn two_fetched_claiming_one_id_is_ambiguous() {
        let old = stored(vec![event("Algebra", 9)]);

        let result =
            reconcile_schedule(Some(&old), fetched(vec![event("Algebra", 9), event("Algebra", 9)]));

        assert!(matches!(result, Err(AmbiguousMerge::SharedIdentity { .. })));
    }

    #[test]
    fn duplicates_without_stored_match_are_fine() {
        let old = stored(vec![event("Physics", 11)]);

        let change =
            reconcile_schedule(Some(&old), fetched(vec![event("Algebra", 9), event("Algebra", 9)]))
                .unwrap();

        assert_eq!(ids(&change), vec![None, None]);
        assert_eq!(change.dropped_event_ids, vec![1]);
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let old = stored(vec![event("Algebra", 9), event("Physics", 11)]);
        let mut moved = event("Physics", 11);
        moved.rooms = vec![ScheduleLink::new("C-303")];
        let incoming = fetched(vec![event("Algebra", 9), moved]);

        let first = reconcile_schedule(Some(&old), incoming.clone()).unwrap();

        // Persist the merge the way the store would: new rows get fresh ids
        let persisted = StoredSchedule {
            schedule: first.schedule.clone(),
            events: first
                .events
                .iter()
                .map(|e| e.with_id(e.id.or(Some(3))))
                .collect(),
            annotations: Vec::new(),
        };

        let second = reconcile_schedule(Some(&persisted), incoming).unwrap();

        assert_eq!(second.kind, ScheduleChangeKind::Unchanged);
        assert_eq!(ids(&second), vec![Some(1), Some(3)]);
    }

    #[test]
    fn fetched_local_flags_are_ignored() {
        let mut flagged = event("Algebra", 9);
        flagged.id = Some(99);
        flagged.is_custom = true;
        flagged.is_hidden = true;

        let first = reconcile_schedule(None, fetched(vec![flagged.clone()])).unwrap();
        assert_eq!(ids(&first), vec![None]);
        assert!(!first.events[0].is_custom);
        assert!(!first.events[0].is_hidden);

        let mut persisted = stored(first.events.clone());
        persisted.annotations.clear();

        for _ in 0..2 {
            let next = reconcile_schedule(Some(&persisted), fetched(vec![flagged.clone()])).unwrap();

            assert_eq!(next.kind, ScheduleChangeKind::Unchanged);
            assert_eq!(ids(&next), vec![Some(1)]);
            persisted.events = next.events;
        }
    }
}
