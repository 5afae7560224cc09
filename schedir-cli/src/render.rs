//! TUI rendering traits for schedir types.
//!
//! Extension traits that add colored terminal rendering to schedir-core
//! types using owo_colors.

use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use owo_colors::OwoColorize;
use schedir_core::annotation::AnnotatedEvent;
use schedir_core::model::{Event, NamedSchedule, Schedule, StoredNamedSchedule};
use schedir_core::projection::AgendaDay;
use schedir_core::reconcile::ScheduleChangeKind;
use schedir_core::sync::SyncOutcome;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for ScheduleChangeKind {
    fn render(&self) -> String {
        let symbol = self.symbol();
        match self {
            ScheduleChangeKind::Insert => symbol.green().to_string(),
            ScheduleChangeKind::Update => symbol.yellow().to_string(),
            ScheduleChangeKind::Delete => symbol.red().to_string(),
            ScheduleChangeKind::Unchanged | ScheduleChangeKind::Retain => {
                symbol.dimmed().to_string()
            }
        }
    }
}

impl Render for NamedSchedule {
    fn render(&self) -> String {
        let marker = if self.is_default { "*" } else { " " };
        let id = self.id.map(|id| format!("#{id}")).unwrap_or_else(|| "unsaved".into());

        format!(
            "{} 📅 {} {} {}",
            marker.green(),
            self.display_name().bold(),
            format!("({})", self.kind).dimmed(),
            id.dimmed()
        )
    }
}

impl Render for Schedule {
    fn render(&self) -> String {
        let marker = if self.is_default { "*" } else { " " };
        let cycle = match &self.recurrence {
            Some(r) if r.cycle_length > 1 => format!("{}-week cycle", r.cycle_length),
            Some(_) => "weekly".to_string(),
            None => "dated".to_string(),
        };
        let id = self.id.map(|id| format!("#{id}")).unwrap_or_default();

        format!(
            "   {} {} {}..{} {} {}",
            marker.green(),
            self.timetable_id,
            self.start_date,
            self.end_date,
            cycle.dimmed(),
            id.dimmed()
        )
    }
}

impl Render for StoredNamedSchedule {
    fn render(&self) -> String {
        let mut lines = vec![self.named.render()];
        lines.extend(self.schedules.iter().map(|s| s.schedule.render()));
        lines.join("\n")
    }
}

impl Render for SyncOutcome {
    fn render(&self) -> String {
        let s = &self.stats;
        if !s.has_changes() {
            return format!("   {}", "Up to date".dimmed());
        }

        let mut parts = Vec::new();
        if s.inserted > 0 {
            parts.push(format!("{} {}", ScheduleChangeKind::Insert.render(), pluralize_count(s.inserted, "timetable")).green().to_string());
        }
        if s.updated > 0 {
            parts.push(format!("{} {} updated", ScheduleChangeKind::Update.render(), pluralize_count(s.updated, "timetable")).yellow().to_string());
        }
        if s.deleted > 0 {
            parts.push(format!("{} {} expired", ScheduleChangeKind::Delete.render(), pluralize_count(s.deleted, "timetable")).red().to_string());
        }

        format!(
            "   {} ({} new, {} dropped)",
            parts.join(", "),
            pluralize_count(s.events_added, "event"),
            pluralize_count(s.events_dropped, "event")
        )
    }
}

fn pluralize_count(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// Rendering that needs the viewer's time zone.
pub trait RenderIn {
    fn render_in(&self, tz: &Tz) -> String;
}

fn links(event: &Event) -> String {
    event
        .rooms
        .iter()
        .chain(&event.lecturers)
        .chain(&event.groups)
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn tag_label(tag: u32) -> String {
    let label = format!("[{tag}]");
    match tag % 6 {
        1 => label.red().to_string(),
        2 => label.yellow().to_string(),
        3 => label.green().to_string(),
        4 => label.cyan().to_string(),
        5 => label.blue().to_string(),
        _ => label.magenta().to_string(),
    }
}

impl RenderIn for AnnotatedEvent {
    fn render_in(&self, tz: &Tz) -> String {
        let event = &self.event;
        let time = format!(
            "{}-{}",
            event.local_start_time(tz).format("%H:%M"),
            event.local_end_time(tz).format("%H:%M")
        );
        let id = event.id.map(|id| format!("#{id}")).unwrap_or_default();

        let mut line = format!("   {} {} {}", time, event.to_string().bold(), links(event).dimmed());
        if self.annotation.tag != 0 {
            line.push_str(&format!(" {}", tag_label(self.annotation.tag)));
        }
        if !self.annotation.comment.is_empty() {
            line.push_str(&format!(" {}", self.annotation.comment.italic()));
        }
        if event.is_hidden {
            line = line.dimmed().to_string();
        }
        format!("{line} {}", id.dimmed())
    }
}

pub fn render_date(date: NaiveDate) -> String {
    format!("{} {}", date.weekday(), date.format("%Y-%m-%d"))
}

/// One agenda day; `annotate` resolves the annotation of each event.
pub fn render_agenda_day(
    day: &AgendaDay,
    tz: &Tz,
    annotate: impl Fn(&Event) -> AnnotatedEvent,
) -> String {
    let mut lines = vec![render_date(day.date).bold().to_string()];

    for slot in &day.slots {
        let parallel = slot.events.len() > 1;
        for event in &slot.events {
            let line = annotate(event).render_in(tz);
            if parallel {
                lines.push(format!("{line} {}", "(parallel)".dimmed()));
            } else {
                lines.push(line);
            }
        }
    }

    lines.join("\n")
}
