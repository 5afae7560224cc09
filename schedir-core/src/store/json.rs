//! Store backed by a single JSON document.
//!
//! Every mutation is applied to a draft copy, written to a temp file and
//! renamed over `schedules.json` before the in-memory copy is swapped, so
//! readers never observe half-applied changes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::annotation::EventExtraData;
use crate::error::{SchedirError, SchedirResult};
use crate::model::{
    Event, NamedSchedule, NamedScheduleData, Schedule, ScheduleData, StoredNamedSchedule,
    StoredSchedule,
};
use crate::reconcile::{ScheduleChangeKind, SyncPlan};
use crate::store::LocalStore;

const STORE_FILE: &str = "schedules.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoreData {
    /// Last id handed out (shared by all rows)
    next_id: i64,
    named_schedules: Vec<NamedSchedule>,
    schedules: Vec<ScheduleData>,
    annotations: Vec<EventExtraData>,
}

pub struct JsonStore {
    /// `None` keeps everything in memory
    dir: Option<PathBuf>,
    data: StoreData,
}

impl JsonStore {
    /// Open (or start) the store in `dir`.
    pub fn open(dir: &Path) -> SchedirResult<Self> {
        let path = dir.join(STORE_FILE);

        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                SchedirError::Store(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            StoreData::default()
        };

        Ok(JsonStore {
            dir: Some(dir.to_path_buf()),
            data,
        })
    }

    pub fn in_memory() -> Self {
        JsonStore {
            dir: None,
            data: StoreData::default(),
        }
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(STORE_FILE))
    }

    fn persist(&self, data: &StoreData) -> SchedirResult<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;

        let path = dir.join(STORE_FILE);
        let temp = dir.join(format!("{STORE_FILE}.tmp"));

        let content = serde_json::to_string_pretty(data)
            .map_err(|e| SchedirError::Serialization(e.to_string()))?;

        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &path)?;

        tracing::debug!(path = %path.display(), "store written");
        Ok(())
    }

    /// Run `change` on a draft; keep it only if it succeeds and reaches disk.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut StoreData) -> SchedirResult<T>,
    ) -> SchedirResult<T> {
        let mut draft = self.data.clone();
        let out = change(&mut draft)?;
        self.persist(&draft)?;
        self.data = draft;
        Ok(out)
    }
}

fn named_not_found(id: i64) -> SchedirError {
    SchedirError::NotFound(format!("named schedule {id}"))
}

fn schedule_not_found(id: i64) -> SchedirError {
    SchedirError::NotFound(format!("schedule {id}"))
}

impl StoreData {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn named_mut(&mut self, id: i64) -> SchedirResult<&mut NamedSchedule> {
        self.named_schedules
            .iter_mut()
            .find(|n| n.id == Some(id))
            .ok_or_else(|| named_not_found(id))
    }

    fn schedule_mut(&mut self, id: i64) -> SchedirResult<&mut ScheduleData> {
        self.schedules
            .iter_mut()
            .find(|s| s.schedule.id == Some(id))
            .ok_or_else(|| schedule_not_found(id))
    }

    fn event_mut(&mut self, schedule_id: i64, event_id: i64) -> SchedirResult<&mut Event> {
        self.schedule_mut(schedule_id)?
            .events
            .iter_mut()
            .find(|e| e.id == Some(event_id))
            .ok_or_else(|| SchedirError::NotFound(format!("event {event_id} in schedule {schedule_id}")))
    }

    fn assemble(&self, named: &NamedSchedule) -> StoredNamedSchedule {
        let schedules = self
            .schedules
            .iter()
            .filter(|s| s.schedule.named_schedule_id == named.id && named.id.is_some())
            .map(|s| StoredSchedule {
                schedule: s.schedule.clone(),
                events: s.events.clone(),
                annotations: self
                    .annotations
                    .iter()
                    .filter(|a| Some(a.schedule_id) == s.schedule.id)
                    .cloned()
                    .collect(),
            })
            .collect();

        StoredNamedSchedule {
            named: named.clone(),
            schedules,
        }
    }

    fn insert_named(&mut self, data: NamedScheduleData) -> SchedirResult<i64> {
        let id = self.alloc_id();
        let is_first = self.named_schedules.is_empty();

        self.named_schedules.push(NamedSchedule {
            id: Some(id),
            is_default: is_first,
            ..data.named
        });

        for schedule in data.schedules {
            self.replace_schedule(id, ScheduleData {
                schedule: Schedule {
                    id: None,
                    ..schedule.schedule
                },
                events: schedule
                    .events
                    .into_iter()
                    .map(|e| e.with_id(None))
                    .collect(),
            })?;
        }
        self.ensure_default_schedule(id);

        Ok(id)
    }

    fn replace_schedule(&mut self, named_id: i64, mut data: ScheduleData) -> SchedirResult<i64> {
        self.named_mut(named_id)?;
        data.schedule.validate()?;

        let schedule_id = match data.schedule.id {
            Some(id) => {
                self.schedule_mut(id)?;
                id
            }
            None => self.alloc_id(),
        };

        data.schedule.id = Some(schedule_id);
        data.schedule.named_schedule_id = Some(named_id);
        for event in data.events.iter_mut() {
            if event.id.is_none() {
                event.id = Some(self.alloc_id());
            }
        }

        let live: HashSet<i64> = data.events.iter().filter_map(|e| e.id).collect();
        self.annotations
            .retain(|a| a.schedule_id != schedule_id || live.contains(&a.event_id));

        match self
            .schedules
            .iter_mut()
            .find(|s| s.schedule.id == Some(schedule_id))
        {
            Some(row) => *row = data,
            None => self.schedules.push(data),
        }

        Ok(schedule_id)
    }

    fn delete_schedule(&mut self, schedule_id: i64, also_delete_annotations: bool) -> SchedirResult<()> {
        let named_id = self.schedule_mut(schedule_id)?.schedule.named_schedule_id;

        self.schedules.retain(|s| s.schedule.id != Some(schedule_id));
        if also_delete_annotations {
            self.annotations.retain(|a| a.schedule_id != schedule_id);
        }
        if let Some(named_id) = named_id {
            self.ensure_default_schedule(named_id);
        }
        Ok(())
    }

    fn delete_named(&mut self, id: i64) -> SchedirResult<()> {
        self.named_mut(id)?;

        let schedule_ids: HashSet<i64> = self
            .schedules
            .iter()
            .filter(|s| s.schedule.named_schedule_id == Some(id))
            .filter_map(|s| s.schedule.id)
            .collect();

        self.named_schedules.retain(|n| n.id != Some(id));
        self.schedules
            .retain(|s| s.schedule.named_schedule_id != Some(id));
        self.annotations
            .retain(|a| !schedule_ids.contains(&a.schedule_id));

        if !self.named_schedules.iter().any(|n| n.is_default) {
            if let Some(first) = self.named_schedules.first_mut() {
                first.is_default = true;
            }
        }
        Ok(())
    }

    /// Exactly one schedule of `named_id` is the selected one (if it has any).
    fn ensure_default_schedule(&mut self, named_id: i64) {
        let mut found = false;
        let mut first: Option<&mut ScheduleData> = None;

        for row in self
            .schedules
            .iter_mut()
            .filter(|s| s.schedule.named_schedule_id == Some(named_id))
        {
            if row.schedule.is_default {
                row.schedule.is_default = !found;
                found = true;
            } else if first.is_none() {
                first = Some(row);
            }
        }

        if !found {
            if let Some(row) = first {
                row.schedule.is_default = true;
            }
        }
    }

    fn set_default_schedule(&mut self, schedule_id: i64, named_id: i64) -> SchedirResult<()> {
        let owner = self.schedule_mut(schedule_id)?.schedule.named_schedule_id;
        if owner != Some(named_id) {
            return Err(SchedirError::NotFound(format!(
                "schedule {schedule_id} in named schedule {named_id}"
            )));
        }

        for row in self
            .schedules
            .iter_mut()
            .filter(|s| s.schedule.named_schedule_id == Some(named_id))
        {
            row.schedule.is_default = row.schedule.id == Some(schedule_id);
        }
        Ok(())
    }

    fn upsert_annotation(&mut self, schedule_id: i64, event_id: i64, comment: &str, tag: u32) -> SchedirResult<()> {
        self.event_mut(schedule_id, event_id)?;

        self.annotations
            .retain(|a| !(a.schedule_id == schedule_id && a.event_id == event_id));

        if !comment.is_empty() || tag != 0 {
            self.annotations.push(EventExtraData {
                schedule_id,
                event_id,
                comment: comment.to_string(),
                tag,
            });
        }
        Ok(())
    }

    fn apply_sync(&mut self, named_id: i64, plan: &SyncPlan, synced_at: DateTime<Utc>) -> SchedirResult<()> {
        self.named_mut(named_id)?;

        for change in &plan.changes {
            match change.kind {
                ScheduleChangeKind::Insert | ScheduleChangeKind::Update => {
                    self.replace_schedule(named_id, change.data())?;
                }
                ScheduleChangeKind::Delete => {
                    if let Some(id) = change.schedule.id {
                        self.delete_schedule(id, true)?;
                    }
                }
                ScheduleChangeKind::Unchanged | ScheduleChangeKind::Retain => {}
            }
        }

        if let Some(timetable_id) = &plan.default_timetable {
            let selected = self
                .schedules
                .iter()
                .find(|s| {
                    s.schedule.named_schedule_id == Some(named_id)
                        && &s.schedule.timetable_id == timetable_id
                })
                .and_then(|s| s.schedule.id);

            if let Some(schedule_id) = selected {
                self.set_default_schedule(schedule_id, named_id)?;
            }
        }
        self.ensure_default_schedule(named_id);

        self.named_mut(named_id)?.last_synced_at = Some(synced_at);
        Ok(())
    }
}

impl LocalStore for JsonStore {
    fn list_named_schedules(&self) -> SchedirResult<Vec<StoredNamedSchedule>> {
        Ok(self
            .data
            .named_schedules
            .iter()
            .map(|n| self.data.assemble(n))
            .collect())
    }

    fn get_named_schedule(&self, id: i64) -> SchedirResult<Option<StoredNamedSchedule>> {
        Ok(self
            .data
            .named_schedules
            .iter()
            .find(|n| n.id == Some(id))
            .map(|n| self.data.assemble(n)))
    }

    fn get_by_external_id(&self, api_id: &str) -> SchedirResult<Option<StoredNamedSchedule>> {
        Ok(self
            .data
            .named_schedules
            .iter()
            .find(|n| n.api_id.as_deref() == Some(api_id))
            .map(|n| self.data.assemble(n)))
    }

    fn insert_named_schedule(&mut self, data: NamedScheduleData) -> SchedirResult<i64> {
        self.commit(|d| d.insert_named(data))
    }

    fn replace_schedule(&mut self, named_schedule_id: i64, data: ScheduleData) -> SchedirResult<i64> {
        self.commit(|d| {
            let id = d.replace_schedule(named_schedule_id, data)?;
            d.ensure_default_schedule(named_schedule_id);
            Ok(id)
        })
    }

    fn delete_schedule(&mut self, schedule_id: i64, also_delete_annotations: bool) -> SchedirResult<()> {
        self.commit(|d| d.delete_schedule(schedule_id, also_delete_annotations))
    }

    fn delete_named_schedule(&mut self, id: i64) -> SchedirResult<()> {
        self.commit(|d| d.delete_named(id))
    }

    fn upsert_annotation(
        &mut self,
        schedule_id: i64,
        event_id: i64,
        comment: &str,
        tag: u32,
    ) -> SchedirResult<()> {
        self.commit(|d| d.upsert_annotation(schedule_id, event_id, comment, tag))
    }

    fn set_event_hidden(&mut self, schedule_id: i64, event_id: i64, hidden: bool) -> SchedirResult<()> {
        self.commit(|d| {
            d.event_mut(schedule_id, event_id)?.is_hidden = hidden;
            Ok(())
        })
    }

    fn insert_custom_event(&mut self, schedule_id: i64, event: Event) -> SchedirResult<i64> {
        self.commit(|d| {
            let id = d.alloc_id();
            d.schedule_mut(schedule_id)?.events.push(Event {
                id: Some(id),
                is_custom: true,
                ..event
            });
            Ok(id)
        })
    }

    fn set_default_named_schedule(&mut self, id: i64) -> SchedirResult<()> {
        self.commit(|d| {
            d.named_mut(id)?;
            for named in d.named_schedules.iter_mut() {
                named.is_default = named.id == Some(id);
            }
            Ok(())
        })
    }

    fn set_default_schedule(&mut self, schedule_id: i64, named_schedule_id: i64) -> SchedirResult<()> {
        self.commit(|d| d.set_default_schedule(schedule_id, named_schedule_id))
    }

    fn count_stored_named_schedules(&self) -> SchedirResult<usize> {
        Ok(self.data.named_schedules.len())
    }

    fn apply_sync(
        &mut self,
        named_schedule_id: i64,
        plan: &SyncPlan,
        synced_at: DateTime<Utc>,
    ) -> SchedirResult<()> {
        self.commit(|d| d.apply_sync(named_schedule_id, plan, synced_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Recurrence, ScheduleKind};
    use crate::reconcile::reconcile_named;
    use chrono::{NaiveDate, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lecture(name: &str, hour: u32) -> Event {
        let mut event = Event::new(
            name,
            "Lecture",
            Utc.with_ymd_and_hms(2025, 9, 1, hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 1, hour + 1, 30, 0).unwrap(),
        )
        .unwrap();
        event.cycle_index = Some(1);
        event
    }

    fn fetched(api_id: &str) -> NamedScheduleData {
        NamedScheduleData {
            named: NamedSchedule::new(ScheduleKind::Group, &format!("Group {api_id}"), Some(api_id)),
            schedules: vec![ScheduleData {
                schedule: Schedule::new(
                    "tt-fall",
                    date(2025, 9, 1),
                    date(2025, 12, 28),
                    Some(Recurrence::new(0, 2).unwrap()),
                )
                .unwrap(),
                events: vec![lecture("Algebra", 9), lecture("Physics", 11)],
            }],
        }
    }

    fn only_schedule(store: &JsonStore, named_id: i64) -> StoredSchedule {
        store
            .get_named_schedule(named_id)
            .unwrap()
            .unwrap()
            .schedules
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn insert_assigns_ids_and_defaults() {
        let mut store = JsonStore::in_memory();
        let first = store.insert_named_schedule(fetched("g-1")).unwrap();
        let second = store.insert_named_schedule(fetched("g-2")).unwrap();

        let listed = store.list_named_schedules().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].named.is_default);
        assert!(!listed[1].named.is_default);
        assert_eq!(store.count_stored_named_schedules().unwrap(), 2);

        let schedule = only_schedule(&store, first);
        assert!(schedule.schedule.is_default);
        assert_eq!(schedule.schedule.named_schedule_id, Some(first));
        assert!(schedule.events.iter().all(|e| e.id.is_some()));

        store.set_default_named_schedule(second).unwrap();
        let listed = store.list_named_schedules().unwrap();
        assert!(!listed[0].named.is_default);
        assert!(listed[1].named.is_default);
    }

    #[test]
    fn external_id_lookup() {
        let mut store = JsonStore::in_memory();
        store.insert_named_schedule(fetched("g-1")).unwrap();

        assert!(store.get_by_external_id("g-1").unwrap().is_some());
        assert!(store.get_by_external_id("g-9").unwrap().is_none());
    }

    #[test]
    fn annotations_upsert_and_clear() {
        let mut store = JsonStore::in_memory();
        let named = store.insert_named_schedule(fetched("g-1")).unwrap();
        let schedule = only_schedule(&store, named);
        let schedule_id = schedule.id().unwrap();
        let event_id = schedule.events[0].id.unwrap();

        store.upsert_annotation(schedule_id, event_id, "quiz", 2).unwrap();
        store.upsert_annotation(schedule_id, event_id, "quiz!", 3).unwrap();
        let annotations = only_schedule(&store, named).annotations;
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].comment, "quiz!");

        store.upsert_annotation(schedule_id, event_id, "", 0).unwrap();
        assert!(only_schedule(&store, named).annotations.is_empty());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut store = JsonStore::in_memory();
        let named = store.insert_named_schedule(fetched("g-1")).unwrap();
        let schedule_id = only_schedule(&store, named).id().unwrap();

        assert!(store.upsert_annotation(schedule_id, 9999, "x", 1).unwrap_err().is_not_found());
        assert!(store.delete_schedule(9999, true).unwrap_err().is_not_found());
        assert!(store.set_default_named_schedule(9999).unwrap_err().is_not_found());
        assert!(store.set_default_schedule(schedule_id, 9999).unwrap_err().is_not_found());
    }

    #[test]
    fn replace_drops_orphaned_annotations() {
        let mut store = JsonStore::in_memory();
        let named = store.insert_named_schedule(fetched("g-1")).unwrap();
        let schedule = only_schedule(&store, named);
        let schedule_id = schedule.id().unwrap();
        for event in &schedule.events {
            store.upsert_annotation(schedule_id, event.id.unwrap(), "note", 1).unwrap();
        }

        let kept = ScheduleData {
            schedule: schedule.schedule.clone(),
            events: vec![schedule.events[0].clone()],
        };
        store.replace_schedule(named, kept).unwrap();

        let after = only_schedule(&store, named);
        assert_eq!(after.events.len(), 1);
        assert_eq!(after.annotations.len(), 1);
        assert_eq!(after.annotations[0].event_id, schedule.events[0].id.unwrap());
    }

    #[test]
    fn delete_named_promotes_next_default() {
        let mut store = JsonStore::in_memory();
        let first = store.insert_named_schedule(fetched("g-1")).unwrap();
        store.insert_named_schedule(fetched("g-2")).unwrap();

        store.delete_named_schedule(first).unwrap();

        let listed = store.list_named_schedules().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].named.is_default);
    }

    #[test]
    fn custom_events_and_hidden_flag() {
        let mut store = JsonStore::in_memory();
        let named = store.insert_named_schedule(fetched("g-1")).unwrap();
        let schedule = only_schedule(&store, named);
        let schedule_id = schedule.id().unwrap();

        let custom_id = store
            .insert_custom_event(schedule_id, lecture("Study group", 18))
            .unwrap();
        store
            .set_event_hidden(schedule_id, schedule.events[1].id.unwrap(), true)
            .unwrap();

        let after = only_schedule(&store, named);
        assert!(after.event(custom_id).unwrap().is_custom);
        assert!(after.events[1].is_hidden);
    }

    #[test]
    fn failed_apply_leaves_store_untouched() {
        let mut store = JsonStore::in_memory();
        let named = store.insert_named_schedule(fetched("g-1")).unwrap();
        let before = store.list_named_schedules().unwrap();

        let stored = only_schedule(&store, named);
        let mut plan = reconcile_named(&[stored], fetched("g-1").schedules, date(2025, 10, 1)).unwrap();
        // Point one change at a schedule that does not exist
        plan.changes[0].kind = ScheduleChangeKind::Update;
        plan.changes[0].schedule.id = Some(9999);

        assert!(store.apply_sync(named, &plan, Utc::now()).is_err());
        assert_eq!(store.list_named_schedules().unwrap(), before);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let named = {
            let mut store = JsonStore::open(dir.path()).unwrap();
            let named = store.insert_named_schedule(fetched("g-1")).unwrap();
            let schedule = only_schedule(&store, named);
            store
                .upsert_annotation(schedule.id().unwrap(), schedule.events[0].id.unwrap(), "seat 4", 1)
                .unwrap();
            named
        };

        let reopened = JsonStore::open(dir.path()).unwrap();
        let schedule = only_schedule(&reopened, named);
        assert_eq!(schedule.annotations[0].comment, "seat 4");
        assert!(!dir.path().join("schedules.json.tmp").exists());
    }
}
