use anyhow::{Context as _, Result};
use chrono::{TimeZone, Utc};
use owo_colors::OwoColorize;
use schedir_core::model::Event;

use super::{Context, parse_date, parse_time, require_current};

pub async fn run(
    ctx: &Context,
    name: &str,
    label: &str,
    date: &str,
    start: &str,
    end: &str,
    cycle: Option<u32>,
) -> Result<()> {
    require_current(&ctx.app.current())?;

    let tz = ctx.app.timezone();
    let date = parse_date(Some(date), ctx.app.today())?;

    let to_utc = |time: &str| -> Result<chrono::DateTime<Utc>> {
        let local = date.and_time(parse_time(time)?);
        tz.from_local_datetime(&local)
            .single()
            .map(|t| t.with_timezone(&Utc))
            .with_context(|| format!("{local} does not exist or is ambiguous in {tz}"))
    };

    let mut event = Event::new(name, label, to_utc(start)?, to_utc(end)?)?;
    event.cycle_index = cycle;

    match ctx.app.add_custom_event(event).await? {
        Some(id) => println!("Added {} {}", name.bold(), format!("#{id}").green()),
        None => anyhow::bail!("No saved timetable selected"),
    }
    Ok(())
}
