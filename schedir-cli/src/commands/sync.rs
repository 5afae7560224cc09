use anyhow::Result;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use schedir_core::SchedirError;
use tokio::task::JoinHandle;

use super::Context;
use crate::render::Render;
use crate::utils::create_spinner;

pub async fn run(ctx: &Context, schedule: Option<i64>) -> Result<()> {
    if let Some(id) = schedule {
        let spinner = create_spinner(format!("Syncing #{id}"));
        let result = ctx.app.request_sync(id).await;
        spinner.finish_and_clear();

        match result? {
            Some(outcome) => {
                println!("📅 {}", outcome.name);
                println!("{}", outcome.render());
            }
            None => println!("{}", format!("Schedule #{id} is gone").dimmed()),
        }
        return Ok(());
    }

    let spinner = create_spinner("Syncing schedules".to_string());
    let follower = follow_view(ctx, &spinner);
    let results = ctx.app.sync_all().await;
    follower.abort();
    spinner.finish_and_clear();
    let results = results?;

    if results.is_empty() {
        println!("{}", "Nothing to sync".dimmed());
        return Ok(());
    }

    let mut failed = 0;
    for (i, (named, result)) in results.iter().enumerate() {
        println!("📅 {}", named.display_name());

        match result {
            Ok(Some(outcome)) => println!("{}", outcome.render()),
            Ok(None) => println!("   {}", "Removed while syncing".dimmed()),
            Err(SchedirError::AmbiguousMerge(e)) => {
                failed += 1;
                println!("   {}", e.to_string().red());
                println!("   {}", "Stored copy kept as is".dimmed());
            }
            Err(e) => {
                failed += 1;
                println!("   {}", e.to_string().red());
            }
        }

        if i < results.len() - 1 {
            println!();
        }
    }

    if failed > 0 {
        println!("\n{} of {} schedules failed to sync", failed, results.len());
    }

    Ok(())
}

/// Name the on-screen schedule in the spinner while it is being synced.
fn follow_view(ctx: &Context, spinner: &ProgressBar) -> JoinHandle<()> {
    let mut rx = ctx.app.subscribe();
    let spinner = spinner.clone();

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let message = {
                let state = rx.borrow_and_update();
                match &state.current {
                    Some(current) if state.syncing => {
                        format!("Syncing {}", current.named.display_name())
                    }
                    _ => "Syncing schedules".to_string(),
                }
            };
            spinner.set_message(message);
        }
    })
}
