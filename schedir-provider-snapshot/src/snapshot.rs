//! Snapshot files: one exported [`NamedScheduleData`] per JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use schedir_core::model::NamedScheduleData;
use schedir_core::remote::protocol::FetchNamedScheduleParams;

const SNAPSHOT_DIR_ENV: &str = "SCHEDIR_SNAPSHOT_DIR";

pub fn snapshot_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(SNAPSHOT_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("schedir")
        .join("providers")
        .join("snapshot");
    Ok(dir)
}

pub fn snapshot_path(dir: &Path, params: &FetchNamedScheduleParams) -> PathBuf {
    let safe_id: String = params
        .external_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{}-{}.json", params.kind, safe_id))
}

/// Load and sanity-check the snapshot for `params`.
pub async fn load(dir: &Path, params: &FetchNamedScheduleParams) -> Result<NamedScheduleData> {
    let path = snapshot_path(dir, params);
    tracing::debug!(path = %path.display(), "reading snapshot");

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("No snapshot for {} '{}' at {}", params.kind, params.display_name, path.display()))?;

    let mut data: NamedScheduleData = serde_json::from_str(&content)
        .with_context(|| format!("Invalid snapshot {}", path.display()))?;

    if data.named.kind != params.kind {
        anyhow::bail!(
            "Snapshot {} holds a {} schedule, expected {}",
            path.display(),
            data.named.kind,
            params.kind
        );
    }

    // Local bookkeeping never comes from the source
    data.named.id = None;
    data.named.is_default = false;
    data.named.api_id = Some(params.external_id.clone());
    for schedule in &mut data.schedules {
        schedule.schedule.id = None;
        schedule.schedule.named_schedule_id = None;
        for event in &mut schedule.events {
            event.id = None;
            event.is_hidden = false;
            event.is_custom = false;
        }
    }

    Ok(data)
}
