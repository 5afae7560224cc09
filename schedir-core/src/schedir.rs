//! The entry points the presentation layer calls.
//!
//! [`Schedir`] owns the store, the fetcher and the on-screen [`ViewState`].
//! Actions that point at something that no longer exists (a deleted event,
//! a schedule removed by a concurrent sync) are logged and otherwise ignored.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::{Mutex, watch};

use crate::config::SchedirConfig;
use crate::error::{SchedirError, SchedirResult};
use crate::model::{
    Event, NamedSchedule, NamedScheduleData, Recurrence, Schedule, ScheduleData, ScheduleKind,
    ScheduleLink, StoredNamedSchedule,
};
use crate::reconcile::{SyncPlan, reconcile_named};
use crate::remote::{Fetcher, ProviderFetcher};
use crate::store::{JsonStore, LocalStore};
use crate::sync::{SyncJobs, SyncOutcome, run_sync};
use crate::view::{Action, ViewState, reduce};

/// Timetable id given to the single schedule of a user-made named schedule.
pub const CUSTOM_TIMETABLE_ID: &str = "custom";

pub struct Schedir<S, F> {
    store: Arc<Mutex<S>>,
    fetcher: Arc<F>,
    jobs: Arc<SyncJobs>,
    view: Arc<watch::Sender<ViewState>>,
    tz: Tz,
    today: Option<NaiveDate>,
}

impl<S, F> Clone for Schedir<S, F> {
    fn clone(&self) -> Self {
        Schedir {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            jobs: Arc::clone(&self.jobs),
            view: Arc::clone(&self.view),
            tz: self.tz,
            today: self.today,
        }
    }
}

impl Schedir<JsonStore, ProviderFetcher> {
    /// Open the store and provider described by `config`.
    pub fn open(config: &SchedirConfig, tz: Tz) -> SchedirResult<Self> {
        let store = JsonStore::open(&config.data_path())?;
        Schedir::new(store, config.fetcher()?, tz)
    }
}

/// Ok(None) for NotFound, everything else unchanged.
fn ignore_missing<T>(result: SchedirResult<T>, action: &str) -> SchedirResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            tracing::debug!(action, error = %e, "target is gone, ignoring");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn default_named<S: LocalStore>(store: &S) -> SchedirResult<Option<StoredNamedSchedule>> {
    let mut all = store.list_named_schedules()?;
    let index = all.iter().position(|n| n.named.is_default).unwrap_or(0);
    Ok((index < all.len()).then(|| all.swap_remove(index)))
}

impl<S: LocalStore, F: Fetcher> Schedir<S, F> {
    /// Wrap `store` and `fetcher`; the default named schedule goes on screen.
    pub fn new(store: S, fetcher: F, tz: Tz) -> SchedirResult<Self> {
        let current = default_named(&store)?;
        let (view, _) = watch::channel(reduce(ViewState::default(), Action::Loaded(current)));

        Ok(Schedir {
            store: Arc::new(Mutex::new(store)),
            fetcher: Arc::new(fetcher),
            jobs: Arc::new(SyncJobs::new()),
            view: Arc::new(view),
            tz,
            today: None,
        })
    }

    /// Use a fixed "today" instead of the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| Utc::now().with_timezone(&self.tz).date_naive())
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Snapshot of the on-screen state.
    pub fn current(&self) -> ViewState {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    fn dispatch(&self, action: Action) {
        self.view
            .send_modify(|state| *state = reduce(std::mem::take(state), action));
    }

    fn reload(&self, store: &S, named_id: i64) -> SchedirResult<()> {
        let stored = store.get_named_schedule(named_id)?;
        self.dispatch(Action::Loaded(stored));
        Ok(())
    }

    pub async fn list(&self) -> SchedirResult<Vec<StoredNamedSchedule>> {
        self.store.lock().await.list_named_schedules()
    }

    /// Put a stored named schedule on screen.
    pub async fn view(&self, named_id: i64) -> SchedirResult<()> {
        let stored = self.store.lock().await.get_named_schedule(named_id)?;
        match stored {
            Some(stored) => self.dispatch(Action::Loaded(Some(stored))),
            None => tracing::debug!(named_id, "no such named schedule"),
        }
        Ok(())
    }

    /// Fetch a remote schedule and show it without saving.
    ///
    /// If it is already stored, the stored copy is shown instead.
    pub async fn preview(&self, kind: ScheduleKind, name: &str, external_id: &str) -> SchedirResult<()> {
        if let Some(stored) = self.store.lock().await.get_by_external_id(external_id)? {
            self.dispatch(Action::Loaded(Some(stored)));
            return Ok(());
        }

        let mut data = self
            .fetcher
            .fetch_named_schedule(name, external_id, kind)
            .await
            .inspect_err(|e| tracing::warn!(name, error = %e, "fetch failed"))?;

        data.named.kind = kind;
        data.named.api_id.get_or_insert_with(|| external_id.to_string());
        data.named.last_synced_at = Some(Utc::now());

        self.dispatch(Action::Previewed(data));
        Ok(())
    }

    /// Create and show an empty user-made named schedule.
    pub async fn create_custom(
        &self,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        recurrence: Option<Recurrence>,
    ) -> SchedirResult<i64> {
        let mut schedule = Schedule::new(CUSTOM_TIMETABLE_ID, start_date, end_date, recurrence)?;
        schedule.is_default = true;

        let data = NamedScheduleData {
            named: NamedSchedule::new(ScheduleKind::Custom, name, None),
            schedules: vec![ScheduleData {
                schedule,
                events: Vec::new(),
            }],
        };

        let mut store = self.store.lock().await;
        let id = store.insert_named_schedule(data)?;
        self.reload(&store, id)?;
        Ok(id)
    }

    /// Fetch, reconcile and persist one named schedule.
    ///
    /// A sync already running for the same schedule is cancelled first and
    /// reports [`SchedirError::Cancelled`]. Returns `None` if the named
    /// schedule no longer exists.
    pub async fn request_sync(&self, named_id: i64) -> SchedirResult<Option<SyncOutcome>> {
        let (token, _guard) = self.jobs.begin(named_id).await;
        self.dispatch(Action::SyncStarted(named_id));

        let result = run_sync(
            &self.store,
            self.fetcher.as_ref(),
            named_id,
            &token,
            self.today(),
        )
        .await;

        match result {
            Ok(outcome) => {
                if let Some(stored) = self.store.lock().await.get_named_schedule(named_id)? {
                    self.dispatch(Action::SyncFinished(stored));
                }
                Ok(Some(outcome))
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(named_id, "named schedule vanished during sync");
                Ok(None)
            }
            Err(SchedirError::Cancelled) => {
                tracing::debug!(named_id, "sync superseded");
                Err(SchedirError::Cancelled)
            }
            Err(e) => {
                tracing::warn!(named_id, error = %e, "sync failed, stored data left as is");
                self.dispatch(Action::SyncFailed {
                    named_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Sync every stored remote named schedule, one after another.
    pub async fn sync_all(&self) -> SchedirResult<Vec<(NamedSchedule, SchedirResult<Option<SyncOutcome>>)>> {
        let remote: Vec<NamedSchedule> = self
            .list()
            .await?
            .into_iter()
            .map(|n| n.named)
            .filter(|n| n.kind.is_remote() && n.id.is_some())
            .collect();

        let mut results = Vec::with_capacity(remote.len());
        for named in remote {
            let Some(id) = named.id else { continue };
            let result = self.request_sync(id).await;
            results.push((named, result));
        }
        Ok(results)
    }

    /// Make `schedule_id` the selected sub-schedule of the current named schedule.
    pub async fn select_schedule(&self, schedule_id: i64) -> SchedirResult<()> {
        let Some(named_id) = self.current().current_id() else {
            tracing::debug!(schedule_id, "nothing saved on screen");
            return Ok(());
        };

        let mut store = self.store.lock().await;
        if ignore_missing(store.set_default_schedule(schedule_id, named_id), "select_schedule")?.is_some() {
            self.reload(&store, named_id)?;
            self.dispatch(Action::SelectSchedule(schedule_id));
        }
        Ok(())
    }

    /// Pick a timetable of an unsaved preview.
    pub fn select_timetable(&self, timetable_id: &str) {
        self.dispatch(Action::SelectTimetable(timetable_id.to_string()));
    }

    /// Persist the previewed named schedule. Returns its id.
    pub async fn save_current(&self) -> SchedirResult<Option<i64>> {
        let state = self.current();
        let Some(current) = state.current else {
            tracing::debug!("nothing on screen to save");
            return Ok(None);
        };
        if let Some(id) = current.id() {
            return Ok(Some(id));
        }

        let mut store = self.store.lock().await;

        if let Some(api_id) = current.named.api_id.as_deref() {
            if let Some(existing) = store.get_by_external_id(api_id)? {
                let id = existing.id();
                self.dispatch(Action::Loaded(Some(existing)));
                return Ok(id);
            }
        }

        let fetched = current
            .schedules
            .into_iter()
            .map(|s| ScheduleData {
                schedule: s.schedule,
                events: s.events,
            })
            .collect();
        let SyncPlan {
            changes,
            default_timetable,
        } = reconcile_named(&[], fetched, self.today())?;
        let default_timetable = state.selected_timetable.or(default_timetable);

        let schedules = changes
            .iter()
            .map(|change| {
                let mut data = change.data();
                data.schedule.is_default = Some(change.timetable_id()) == default_timetable.as_deref();
                data
            })
            .collect();

        let id = store.insert_named_schedule(NamedScheduleData {
            named: current.named,
            schedules,
        })?;
        tracing::info!(named_id = id, "saved named schedule");

        self.reload(&store, id)?;
        Ok(Some(id))
    }

    /// Remove the current named schedule (or drop the preview) and show the
    /// default one.
    pub async fn delete_current(&self) -> SchedirResult<()> {
        let named_id = self.current().current_id();

        if let Some(named_id) = named_id {
            self.jobs.cancel(named_id).await;
        }

        let mut store = self.store.lock().await;
        if let Some(named_id) = named_id {
            ignore_missing(store.delete_named_schedule(named_id), "delete_current")?;
            tracing::info!(named_id, "deleted named schedule");
        }

        let next = default_named(&*store)?;
        self.dispatch(Action::Loaded(next));
        Ok(())
    }

    /// Make `named_id` the default named schedule.
    pub async fn set_default(&self, named_id: i64) -> SchedirResult<()> {
        let mut store = self.store.lock().await;
        ignore_missing(store.set_default_named_schedule(named_id), "set_default")?;
        Ok(())
    }

    /// Resolve `event_id` to its schedule within the saved current named schedule.
    fn locate(&self, event_id: i64) -> Option<(i64, i64)> {
        let state = self.current();
        let current = state.current.as_ref()?;
        let named_id = current.id()?;
        let schedule_id = current.schedule_of_event(event_id)?.id()?;
        Some((named_id, schedule_id))
    }

    /// Set (or clear, with an empty comment and tag 0) an event's annotation.
    pub async fn set_annotation(&self, event_id: i64, comment: &str, tag: u32) -> SchedirResult<()> {
        let Some((named_id, schedule_id)) = self.locate(event_id) else {
            tracing::debug!(event_id, "event not on screen");
            return Ok(());
        };

        let mut store = self.store.lock().await;
        if ignore_missing(
            store.upsert_annotation(schedule_id, event_id, comment, tag),
            "set_annotation",
        )?
        .is_some()
        {
            self.reload(&store, named_id)?;
        }
        Ok(())
    }

    pub async fn set_hidden(&self, event_id: i64, hidden: bool) -> SchedirResult<()> {
        let Some((named_id, schedule_id)) = self.locate(event_id) else {
            tracing::debug!(event_id, "event not on screen");
            return Ok(());
        };

        let mut store = self.store.lock().await;
        if ignore_missing(store.set_event_hidden(schedule_id, event_id, hidden), "set_hidden")?.is_some() {
            self.reload(&store, named_id)?;
        }
        Ok(())
    }

    /// Add a locally created event to the on-screen schedule.
    ///
    /// A cycle week outside the schedule's cycle is rejected.
    pub async fn add_custom_event(&self, event: Event) -> SchedirResult<Option<i64>> {
        let state = self.current();
        let (Some(named_id), Some(schedule)) = (state.current_id(), state.schedule()) else {
            tracing::debug!("no saved schedule on screen");
            return Ok(None);
        };
        let Some(schedule_id) = schedule.id() else {
            tracing::debug!("no saved schedule on screen");
            return Ok(None);
        };

        event.validate()?;
        schedule.schedule.check_cycle_index(event.cycle_index)?;

        let mut store = self.store.lock().await;
        let id = ignore_missing(store.insert_custom_event(schedule_id, event), "add_custom_event")?;
        if id.is_some() {
            self.reload(&store, named_id)?;
        }
        Ok(id)
    }

    /// Schedules an on-screen event links to, in the order offered by the
    /// on-screen kind's [`ScheduleKind::related_kinds`].
    pub fn related(&self, event_id: i64) -> Vec<(ScheduleKind, ScheduleLink)> {
        let state = self.current();
        let Some(current) = state.current.as_ref() else {
            return Vec::new();
        };
        let Some(event) = current
            .schedule_of_event(event_id)
            .and_then(|s| s.event(event_id))
        else {
            tracing::debug!(event_id, "event not on screen");
            return Vec::new();
        };

        event
            .related_links(current.named.kind)
            .into_iter()
            .map(|(kind, link)| (kind, link.clone()))
            .collect()
    }

    /// Show the `index`th schedule from [`Schedir::related`] (unsaved unless
    /// it is stored already). Returns false when there is no such link.
    pub async fn open_related(&self, event_id: i64, index: usize) -> SchedirResult<bool> {
        let Some((kind, link)) = self.related(event_id).into_iter().nth(index) else {
            tracing::debug!(event_id, index, "no such related schedule");
            return Ok(false);
        };
        let Some(api_id) = link.api_id.as_deref() else {
            return Ok(false);
        };

        self.preview(kind, &link.name, api_id).await?;
        Ok(true)
    }
}
