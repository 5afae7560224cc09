use anyhow::Result;
use owo_colors::OwoColorize;

use super::{Context, require_current};

pub async fn run(ctx: &Context, schedule_id: i64) -> Result<()> {
    let state = ctx.app.current();
    require_current(&state)?;

    let known = state
        .current
        .as_ref()
        .is_some_and(|c| c.schedule(schedule_id).is_some());
    if !known {
        anyhow::bail!("Timetable #{schedule_id} is not part of this schedule");
    }

    ctx.app.select_schedule(schedule_id).await?;
    println!("Selected timetable {}", format!("#{schedule_id}").green());
    Ok(())
}

pub async fn set_default(ctx: &Context, id: i64) -> Result<()> {
    let exists = ctx.app.list().await?.iter().any(|n| n.id() == Some(id));
    if !exists {
        anyhow::bail!("Schedule #{id} not found. See `schedir list`.");
    }

    ctx.app.set_default(id).await?;
    println!("Default schedule is now {}", format!("#{id}").green());
    Ok(())
}
