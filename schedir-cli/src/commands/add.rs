use anyhow::Result;
use owo_colors::OwoColorize;
use schedir_core::model::ScheduleKind;

use super::Context;
use crate::render::Render;
use crate::utils::create_spinner;

pub async fn run(
    ctx: &Context,
    kind: ScheduleKind,
    external_id: &str,
    name: &str,
    timetable: Option<&str>,
) -> Result<()> {
    if !kind.is_remote() {
        anyhow::bail!("Custom schedules are not fetched. Use `schedir create <name> --until <date>` instead.");
    }

    let spinner = create_spinner(format!("Fetching {kind} {name}"));
    let result = ctx.app.preview(kind, name, external_id).await;
    spinner.finish_and_clear();
    result?;

    if let Some(timetable) = timetable {
        ctx.app.select_timetable(timetable);
    }

    let Some(id) = ctx.app.save_current().await? else {
        anyhow::bail!("Nothing was fetched for {name}");
    };

    if let Some(current) = ctx.app.current().current {
        println!("{}", current.render());
    }
    println!("\nSaved as {}", format!("#{id}").green());

    Ok(())
}
