use anyhow::Result;
use owo_colors::OwoColorize;

use super::{Context, annotator, parse_date, require_current};
use crate::render::{Render, RenderIn, render_date};

pub fn run(ctx: &Context, date: Option<&str>) -> Result<()> {
    let state = ctx.app.current();
    require_current(&state)?;

    let tz = ctx.app.timezone();
    let date = parse_date(date, ctx.app.today())?;

    if let Some(current) = &state.current {
        println!("{}", current.named.render());
    }

    let Some(grid) = state.grid(&tz) else {
        println!("{}", "No timetable".dimmed());
        return Ok(());
    };

    let cycle = grid
        .cycle_index_of(date)
        .map(|c| format!(" (week {c})"))
        .unwrap_or_default();
    println!("{}{}", render_date(date).bold(), cycle.dimmed());

    let events = grid.events_on(date);
    if events.is_empty() {
        println!("   {}", "No classes".dimmed());
        return Ok(());
    }

    let annotate = annotator(&state);
    for event in events {
        println!("{}", annotate(event).render_in(&tz));
    }

    Ok(())
}
