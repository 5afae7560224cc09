use anyhow::Result;
use owo_colors::OwoColorize;

use super::{Context, require_current};

pub async fn run(ctx: &Context) -> Result<()> {
    let state = ctx.app.current();
    require_current(&state)?;

    let name = state
        .current
        .as_ref()
        .map(|c| c.named.display_name().to_string())
        .unwrap_or_default();

    ctx.app.delete_current().await?;
    println!("Removed {}", name.red());

    if let Some(next) = ctx.app.current().current {
        println!("Now showing {}", next.named.display_name().bold());
    }
    Ok(())
}
