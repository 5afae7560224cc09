use anyhow::Result;
use owo_colors::OwoColorize;

use super::Context;
use crate::render::Render;

pub async fn run(ctx: &Context) -> Result<()> {
    let all = ctx.app.list().await?;

    if all.is_empty() {
        println!("{}", "No schedules stored yet".dimmed());
        return Ok(());
    }

    for (i, named) in all.iter().enumerate() {
        println!("{}", named.render());
        if let Some(synced) = named.named.last_synced_at {
            println!("     {}", format!("synced {}", synced.format("%Y-%m-%d %H:%M UTC")).dimmed());
        }

        // Add spacing between schedules (but not after the last one)
        if i < all.len() - 1 {
            println!();
        }
    }

    Ok(())
}
