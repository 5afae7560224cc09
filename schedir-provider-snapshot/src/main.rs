//! schedir-provider-snapshot - serves schedules from JSON snapshot files
//!
//! This binary implements the schedir provider protocol, communicating
//! with schedir via JSON over stdin/stdout.
//!
//! Snapshots are looked up as:
//!   $SCHEDIR_SNAPSHOT_DIR/{kind}-{external_id}.json
//!   ~/.config/schedir/providers/snapshot/{kind}-{external_id}.json

mod snapshot;

use std::io::{self, BufRead, Write};

use schedir_core::remote::protocol::{Command, FetchNamedScheduleParams, Request, Response};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("Failed to read stdin: {e}");
                break;
            }
        };

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(request).await,
            Err(e) => Response::error(&format!("Failed to parse request: {e}")),
        };

        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }

    Ok(())
}

async fn handle_request(request: Request) -> String {
    match request.command {
        Command::FetchNamedSchedule => handle_fetch_named_schedule(request.params).await,
    }
}

async fn handle_fetch_named_schedule(params: serde_json::Value) -> String {
    let params: FetchNamedScheduleParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return Response::error(&format!("Invalid params: {e}")),
    };

    let dir = match snapshot::snapshot_dir() {
        Ok(dir) => dir,
        Err(e) => return Response::error(&format!("{e:#}")),
    };

    let data = match snapshot::load(&dir, &params).await {
        Ok(data) => data,
        Err(e) => return Response::error(&format!("{e:#}")),
    };

    Response::success(data)
        .unwrap_or_else(|e| Response::error(&format!("Failed to encode response: {e}")))
}
