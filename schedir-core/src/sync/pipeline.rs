//! Fetch → reconcile → apply for one named schedule.

use std::fmt;

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::error::{FetchError, SchedirError, SchedirResult};
use crate::reconcile::{SyncStats, reconcile_named};
use crate::remote::Fetcher;
use crate::store::LocalStore;
use crate::sync::CancelToken;

/// What a finished sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub named_id: i64,
    pub name: String,
    pub stats: SyncStats,
    pub default_timetable: Option<String>,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        write!(
            f,
            "{}: +{} ~{} ={} -{} ?{} ({} new events, {} dropped)",
            self.name,
            s.inserted,
            s.updated,
            s.unchanged,
            s.deleted,
            s.retained,
            s.events_added,
            s.events_dropped
        )
    }
}

/// Run one sync unit.
///
/// The store lock is only taken around the synchronous re-read, reconcile
/// and apply, so local edits made while the fetch is in flight are seen by
/// the merge. Nothing is written once `token` is cancelled.
pub async fn run_sync<S, F>(
    store: &Mutex<S>,
    fetcher: &F,
    named_id: i64,
    token: &CancelToken,
    today: NaiveDate,
) -> SchedirResult<SyncOutcome>
where
    S: LocalStore,
    F: Fetcher + ?Sized,
{
    let named = store
        .lock()
        .await
        .get_named_schedule(named_id)?
        .ok_or_else(|| SchedirError::NotFound(format!("named schedule {named_id}")))?
        .named;

    let display_name = named.display_name().to_string();
    if !named.kind.is_remote() {
        return Err(FetchError::NotRemote(display_name).into());
    }
    let external_id = named.api_id.clone().unwrap_or_default();

    tracing::info!(named_id, name = %display_name, "fetching");

    let fetched = tokio::select! {
        _ = token.cancelled() => return Err(SchedirError::Cancelled),
        result = fetcher.fetch_named_schedule(&display_name, &external_id, named.kind) => result?,
    };

    let mut store = store.lock().await;
    if token.is_cancelled() {
        return Err(SchedirError::Cancelled);
    }

    let stored = store
        .get_named_schedule(named_id)?
        .ok_or_else(|| SchedirError::NotFound(format!("named schedule {named_id}")))?;

    let plan = reconcile_named(&stored.schedules, fetched.schedules, today)?;
    for change in &plan.changes {
        tracing::debug!(named_id, "{change}");
    }

    store.apply_sync(named_id, &plan, Utc::now())?;

    let outcome = SyncOutcome {
        named_id,
        name: display_name,
        stats: plan.stats(),
        default_timetable: plan.default_timetable.clone(),
    };
    tracing::info!("{outcome}");

    Ok(outcome)
}
