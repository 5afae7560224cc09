use anyhow::Result;
use owo_colors::OwoColorize;
use schedir_core::model::Recurrence;

use super::{Context, parse_date};

pub async fn run(ctx: &Context, name: &str, from: Option<&str>, until: &str, cycle: u32) -> Result<()> {
    let today = ctx.app.today();
    let start = parse_date(from, today)?;
    let end = parse_date(Some(until), today)?;

    let recurrence = Recurrence::new(0, cycle)?;
    let id = ctx.app.create_custom(name, start, end, Some(recurrence)).await?;

    println!("Created {} {}", name.bold(), format!("#{id}").green());
    Ok(())
}
