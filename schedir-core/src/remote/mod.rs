//! Fetching named schedules from their authoritative source.

pub mod protocol;
mod provider;

pub use provider::{DEFAULT_PROVIDER_TIMEOUT, Provider, ProviderFetcher};

use async_trait::async_trait;

use crate::error::FetchError;
use crate::model::{NamedScheduleData, ScheduleKind};

/// Source of fresh schedule data.
///
/// A fetch either yields a complete [`NamedScheduleData`] or fails; partial
/// results are never returned.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_named_schedule(
        &self,
        display_name: &str,
        external_id: &str,
        kind: ScheduleKind,
    ) -> Result<NamedScheduleData, FetchError>;
}
