use anyhow::Result;
use owo_colors::OwoColorize;

use super::{Context, require_current};

fn ensure_on_screen(ctx: &Context, event_id: i64) -> Result<()> {
    let state = ctx.app.current();
    require_current(&state)?;

    let known = state
        .current
        .as_ref()
        .is_some_and(|c| c.schedule_of_event(event_id).is_some());
    if !known {
        anyhow::bail!("Event #{event_id} is not part of this schedule");
    }
    Ok(())
}

pub async fn note(ctx: &Context, event_id: i64, comment: &str, tag: u32) -> Result<()> {
    ensure_on_screen(ctx, event_id)?;
    ctx.app.set_annotation(event_id, comment, tag).await?;

    if comment.is_empty() && tag == 0 {
        println!("Cleared note on {}", format!("#{event_id}").dimmed());
    } else {
        println!("Saved note on {}", format!("#{event_id}").green());
    }
    Ok(())
}

pub async fn hide(ctx: &Context, event_id: i64, hidden: bool) -> Result<()> {
    ensure_on_screen(ctx, event_id)?;
    ctx.app.set_hidden(event_id, hidden).await?;

    let verb = if hidden { "Hid" } else { "Unhid" };
    println!("{verb} {}", format!("#{event_id}").green());
    Ok(())
}
