mod commands;
mod render;
mod utils;

use anyhow::Result;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use schedir_core::Schedir;
use schedir_core::config::SchedirConfig;
use schedir_core::model::ScheduleKind;
use tracing_subscriber::EnvFilter;

use crate::commands::Context;

#[derive(Parser)]
#[command(name = "schedir")]
#[command(about = "Keep a local, annotated copy of your timetables in sync")]
struct Cli {
    /// Operate on this named schedule instead of the default one (by id)
    #[arg(short, long, global = true)]
    schedule: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a group, lecturer or room schedule and save it
    Add {
        kind: ScheduleKind,
        external_id: String,
        name: String,

        /// Timetable to select when the schedule has several
        #[arg(long)]
        timetable: Option<String>,
    },
    /// Create an empty schedule of your own
    Create {
        name: String,

        /// First day (YYYY-MM-DD, default today)
        #[arg(long)]
        from: Option<String>,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        until: String,

        /// Number of weeks in one cycle
        #[arg(long, default_value_t = 1)]
        cycle: u32,
    },
    /// List stored schedules
    List,
    /// Re-fetch stored schedules (all of them unless --schedule is given)
    Sync,
    /// Show one day
    Show {
        /// Day to show (YYYY-MM-DD or e.g. "tomorrow", "next friday")
        #[arg(long)]
        date: Option<String>,
    },
    /// Show the upcoming weeks
    Agenda {
        #[arg(long)]
        from: Option<String>,

        #[arg(short, long)]
        weeks: Option<u32>,
    },
    /// Comment on or tag an event (empty comment and tag 0 clear it)
    Note {
        event_id: i64,

        #[arg(short, long, default_value = "")]
        comment: String,

        #[arg(short, long, default_value_t = 0)]
        tag: u32,
    },
    Hide {
        event_id: i64,
    },
    Unhide {
        event_id: i64,
    },
    /// Add an event of your own to the selected timetable
    Event {
        name: String,

        /// Day of the event (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Start time (HH:MM)
        #[arg(long)]
        start: String,

        /// End time (HH:MM)
        #[arg(long)]
        end: String,

        /// Repeat in this week of every cycle instead of happening once
        #[arg(long)]
        cycle: Option<u32>,

        #[arg(long, default_value = "Custom")]
        label: String,
    },
    /// Show the rooms, lecturers or groups an event links to
    Related {
        event_id: i64,

        /// Open the n-th linked schedule
        #[arg(long)]
        open: Option<usize>,
    },
    /// Select the timetable shown for the current schedule
    Select {
        schedule_id: i64,
    },
    /// Make a named schedule the default one
    Default {
        id: i64,
    },
    /// Remove a named schedule with its annotations
    Remove,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let ctx = load_context(cli.schedule).await?;

    match cli.command {
        Commands::Add {
            kind,
            external_id,
            name,
            timetable,
        } => commands::add::run(&ctx, kind, &external_id, &name, timetable.as_deref()).await,
        Commands::Create {
            name,
            from,
            until,
            cycle,
        } => commands::create::run(&ctx, &name, from.as_deref(), &until, cycle).await,
        Commands::List => commands::list::run(&ctx).await,
        Commands::Sync => commands::sync::run(&ctx, cli.schedule).await,
        Commands::Show { date } => commands::show::run(&ctx, date.as_deref()),
        Commands::Agenda { from, weeks } => commands::agenda::run(&ctx, from.as_deref(), weeks),
        Commands::Note {
            event_id,
            comment,
            tag,
        } => commands::annotate::note(&ctx, event_id, &comment, tag).await,
        Commands::Hide { event_id } => commands::annotate::hide(&ctx, event_id, true).await,
        Commands::Unhide { event_id } => commands::annotate::hide(&ctx, event_id, false).await,
        Commands::Event {
            name,
            date,
            start,
            end,
            cycle,
            label,
        } => commands::event::run(&ctx, &name, &label, &date, &start, &end, cycle).await,
        Commands::Related { event_id, open } => commands::related::run(&ctx, event_id, open).await,
        Commands::Select { schedule_id } => commands::select::run(&ctx, schedule_id).await,
        Commands::Default { id } => commands::select::set_default(&ctx, id).await,
        Commands::Remove => commands::remove::run(&ctx).await,
    }
}

async fn load_context(schedule: Option<i64>) -> Result<Context> {
    let config = SchedirConfig::load()?;
    let tz = resolve_timezone(&config)?;
    let app = Schedir::open(&config, tz)?;

    if let Some(id) = schedule {
        app.view(id).await?;
        if app.current().current_id() != Some(id) {
            anyhow::bail!("Schedule #{id} not found. See `schedir list`.");
        }
    }

    Ok(Context { app, config })
}

/// Configured zone, else the system zone, else UTC.
fn resolve_timezone(config: &SchedirConfig) -> Result<Tz> {
    if let Some(tz) = config.timezone()? {
        return Ok(tz);
    }

    let system = iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse::<Tz>().ok());
    if system.is_none() {
        tracing::debug!("could not determine system time zone, using UTC");
    }
    Ok(system.unwrap_or(Tz::UTC))
}
