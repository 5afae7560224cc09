use anyhow::Result;
use owo_colors::OwoColorize;

use super::{Context, require_current};
use crate::render::Render;
use crate::utils::create_spinner;

/// List the rooms, lecturers and groups an event links to, or open one of them.
pub async fn run(ctx: &Context, event_id: i64, open: Option<usize>) -> Result<()> {
    require_current(&ctx.app.current())?;

    let related = ctx.app.related(event_id);
    if related.is_empty() {
        println!("{}", format!("Event #{event_id} links to no other schedules").dimmed());
        return Ok(());
    }

    let Some(index) = open else {
        for (i, (kind, link)) in related.iter().enumerate() {
            println!("   {} {} {}", format!("{}.", i + 1).dimmed(), link.name.bold(), format!("({kind})").dimmed());
        }
        println!("\n{}", format!("Open one with: schedir related {event_id} --open <n>").dimmed());
        return Ok(());
    };

    let Some((kind, link)) = index.checked_sub(1).and_then(|i| related.get(i)) else {
        anyhow::bail!("Pick a number between 1 and {}", related.len());
    };

    let spinner = create_spinner(format!("Fetching {kind} {}", link.name));
    let opened = ctx.app.open_related(event_id, index - 1).await;
    spinner.finish_and_clear();
    if !opened? {
        anyhow::bail!("{} is no longer linked from event #{event_id}", link.name);
    }

    let state = ctx.app.current();
    if let Some(current) = &state.current {
        println!("{}", current.render());
    }
    if !state.is_saved() {
        if let Some(api_id) = &link.api_id {
            println!(
                "\n{}",
                format!("Save it with: schedir add {kind} {api_id} \"{}\"", link.name).dimmed()
            );
        }
    }

    Ok(())
}
