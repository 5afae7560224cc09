//! Provider subprocess protocol.
//!
//! Talks to external provider binaries (e.g. `schedir-provider-snapshot`)
//! using JSON over stdin/stdout. Any executable that speaks the protocol in
//! [`crate::remote::protocol`] can be a provider; scraping the institution's
//! site is its business, not ours.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::FetchError;
use crate::model::{NamedScheduleData, ScheduleKind};
use crate::remote::Fetcher;
use crate::remote::protocol::{
    Command as ProviderCommand, FetchNamedScheduleParams, Request, Response,
};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    fn binary_path(&self) -> Result<PathBuf, FetchError> {
        let binary_name = format!("schedir-provider-{}", self.0);
        which::which(&binary_name).map_err(|_| FetchError::ProviderNotInstalled(binary_name))
    }

    pub async fn call<R: DeserializeOwned>(
        &self,
        command: ProviderCommand,
        params: serde_json::Value,
    ) -> Result<R, FetchError> {
        let request = Request { command, params };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| FetchError::InvalidResponse(format!("Failed to encode request: {e}")))?;

        let binary_path = self.binary_path()?;
        tracing::debug!(provider = %self.0, binary = %binary_path.display(), ?command, "calling provider");

        let mut child = Command::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                FetchError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| FetchError::Provider("Provider stdin was not captured".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await
            .map_err(|e| FetchError::Provider(format!("Failed to write request: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| FetchError::Provider(format!("Failed to read response: {e}")))?;

        if !output.status.success() {
            return Err(FetchError::Provider(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        parse_response(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Decode the first response line printed by a provider.
fn parse_response<R: DeserializeOwned>(stdout: &str) -> Result<R, FetchError> {
    let Some(line) = stdout.lines().find(|l| !l.trim().is_empty()) else {
        return Err(FetchError::InvalidResponse("Provider returned no response".into()));
    };

    let response: Response<R> = serde_json::from_str(line)
        .map_err(|e| FetchError::InvalidResponse(format!("Failed to parse response: {e}")))?;

    match response {
        Response::Success { data } => Ok(data),
        Response::Error { error } => Err(FetchError::Provider(error)),
    }
}

/// [`Fetcher`] backed by a provider binary.
#[derive(Debug, Clone)]
pub struct ProviderFetcher {
    provider: Provider,
    timeout: Duration,
}

impl ProviderFetcher {
    pub fn new(provider: Provider, timeout: Duration) -> Self {
        ProviderFetcher { provider, timeout }
    }
}

#[async_trait]
impl Fetcher for ProviderFetcher {
    async fn fetch_named_schedule(
        &self,
        display_name: &str,
        external_id: &str,
        kind: ScheduleKind,
    ) -> Result<NamedScheduleData, FetchError> {
        if !kind.is_remote() {
            return Err(FetchError::NotRemote(display_name.to_string()));
        }

        let params = serde_json::to_value(FetchNamedScheduleParams {
            display_name: display_name.to_string(),
            external_id: external_id.to_string(),
            kind,
        })
        .map_err(|e| FetchError::InvalidResponse(format!("Failed to encode params: {e}")))?;

        let data: NamedScheduleData = timeout(
            self.timeout,
            self.provider.call(ProviderCommand::FetchNamedSchedule, params),
        )
        .await
        .map_err(|_| FetchError::ProviderTimeout(self.timeout.as_secs()))??;

        validate_fetched(&data)?;
        Ok(data)
    }
}

fn validate_fetched(data: &NamedScheduleData) -> Result<(), FetchError> {
    for schedule in &data.schedules {
        schedule
            .schedule
            .validate()
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        for event in &schedule.events {
            event
                .validate()
                .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, NamedSchedule, Schedule, ScheduleData};
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn parses_success_line() {
        let value: Vec<u32> =
            parse_response("{\"status\":\"success\",\"data\":[1,2]}\n").unwrap();
        assert_eq!(value, vec![1, 2]);
    }

    #[test]
    fn provider_error_is_surfaced() {
        let result: Result<u32, _> =
            parse_response("{\"status\":\"error\",\"error\":\"site is down\"}");
        assert_eq!(result, Err(FetchError::Provider("site is down".into())));
    }

    #[test]
    fn garbage_is_invalid_response() {
        let result: Result<u32, _> = parse_response("");
        assert!(matches!(result, Err(FetchError::InvalidResponse(_))));

        let result: Result<u32, _> = parse_response("<html>");
        assert!(matches!(result, Err(FetchError::InvalidResponse(_))));
    }

    fn fetched_with_event(event: Event) -> NamedScheduleData {
        let day = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        NamedScheduleData {
            named: NamedSchedule::new(ScheduleKind::Group, "CS-101", Some("g-42")),
            schedules: vec![ScheduleData {
                schedule: Schedule::new("tt-1", day, day + chrono::Duration::days(90), None).unwrap(),
                events: vec![event],
            }],
        }
    }

    #[test]
    fn events_ending_before_start_are_rejected() {
        let start = Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap();
        let mut event =
            Event::new("Algebra", "Lecture", start, start + chrono::Duration::hours(1)).unwrap();
        assert_eq!(validate_fetched(&fetched_with_event(event.clone())), Ok(()));

        event.end = start;
        let result = validate_fetched(&fetched_with_event(event));
        assert!(matches!(result, Err(FetchError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn missing_binary_is_not_installed() {
        let fetcher = ProviderFetcher::new(
            Provider::from_name("does-not-exist-anywhere"),
            DEFAULT_PROVIDER_TIMEOUT,
        );

        let result = fetcher
            .fetch_named_schedule("CS-101", "g-42", ScheduleKind::Group)
            .await;
        assert!(matches!(result, Err(FetchError::ProviderNotInstalled(_))));
    }

    #[tokio::test]
    async fn custom_schedules_are_not_fetched() {
        let fetcher = ProviderFetcher::new(Provider::from_name("snapshot"), DEFAULT_PROVIDER_TIMEOUT);

        let result = fetcher
            .fetch_named_schedule("Mine", "", ScheduleKind::Custom)
            .await;
        assert_eq!(result, Err(FetchError::NotRemote("Mine".into())));
    }
}
