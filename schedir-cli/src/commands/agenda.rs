use anyhow::Result;
use owo_colors::OwoColorize;

use super::{Context, annotator, parse_date, require_current};
use crate::render::{Render, render_agenda_day};

pub fn run(ctx: &Context, from: Option<&str>, weeks: Option<u32>) -> Result<()> {
    let state = ctx.app.current();
    require_current(&state)?;

    let tz = ctx.app.timezone();
    let from = parse_date(from, ctx.app.today())?;
    let weeks = weeks.unwrap_or(ctx.config.agenda_weeks);

    if let Some(current) = &state.current {
        println!("{}\n", current.named.render());
    }

    let days = state.agenda(&tz, from, weeks);
    if days.is_empty() {
        println!("{}", "Nothing scheduled".dimmed());
        return Ok(());
    }

    let annotate = annotator(&state);
    let rendered: Vec<String> = days
        .iter()
        .map(|day| render_agenda_day(day, &tz, &annotate))
        .collect();
    println!("{}", rendered.join("\n\n"));

    Ok(())
}
