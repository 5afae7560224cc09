pub mod add;
pub mod agenda;
pub mod annotate;
pub mod create;
pub mod event;
pub mod list;
pub mod related;
pub mod remove;
pub mod select;
pub mod show;
pub mod sync;

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use chrono::{NaiveDate, NaiveTime};
use schedir_core::Schedir;
use schedir_core::annotation::AnnotatedEvent;
use schedir_core::config::SchedirConfig;
use schedir_core::model::Event;
use schedir_core::remote::ProviderFetcher;
use schedir_core::store::JsonStore;
use schedir_core::view::ViewState;

pub type App = Schedir<JsonStore, ProviderFetcher>;

pub struct Context {
    pub app: App,
    pub config: SchedirConfig,
}

/// YYYY-MM-DD or natural language ("tomorrow", "next friday"); `None` means today.
pub fn parse_date(arg: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    let input = match arg.map(str::trim) {
        None => return Ok(today),
        Some(s) if s.eq_ignore_ascii_case("today") => return Ok(today),
        Some(s) => s,
    };

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }

    let parsed = fuzzydate::parse(input)
        .map_err(|_| anyhow::anyhow!("Could not parse date: \"{}\"", input))?;
    Ok(parsed.date())
}

pub fn parse_time(arg: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(arg.trim(), "%H:%M")
        .with_context(|| format!("Invalid time '{arg}', expected HH:MM"))
}

/// Lookup from event to its annotated form for the on-screen schedule.
pub fn annotator(state: &ViewState) -> impl Fn(&Event) -> AnnotatedEvent {
    let by_id: HashMap<i64, AnnotatedEvent> = state
        .annotated_events()
        .into_iter()
        .filter_map(|a| a.event.id.map(|id| (id, a)))
        .collect();

    move |event: &Event| {
        event
            .id
            .and_then(|id| by_id.get(&id).cloned())
            .unwrap_or_else(|| AnnotatedEvent {
                event: event.clone(),
                annotation: Default::default(),
            })
    }
}

/// Fail with a hint when nothing is stored yet.
pub fn require_current(state: &ViewState) -> Result<()> {
    if state.current.is_none() {
        anyhow::bail!(
            "No schedules found.\n\n\
            Add your first schedule with:\n  \
            schedir add <group|lecturer|room> <external-id> <name>\n\n\
            Example:\n  \
            schedir add group 4213 \"CS-101\""
        );
    }
    Ok(())
}
