//! Registry enforcing one in-flight sync per named schedule.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::sync::{CancelToken, FinishGuard};

#[derive(Debug, Default)]
pub struct SyncJobs {
    jobs: Mutex<HashMap<i64, CancelToken>>,
}

impl SyncJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new unit for `named_id`.
    ///
    /// A unit already running for the same named schedule is cancelled and
    /// awaited before this returns.
    pub async fn begin(&self, named_id: i64) -> (CancelToken, FinishGuard) {
        let (token, guard) = CancelToken::new();

        let previous = self.jobs.lock().await.insert(named_id, token.clone());

        if let Some(previous) = previous {
            if !previous.is_finished() {
                tracing::debug!(named_id, "cancelling previous sync");
                previous.cancel();
                previous.finished().await;
            }
        }

        (token, guard)
    }

    /// Cancel whatever runs for `named_id` without starting anything new.
    pub async fn cancel(&self, named_id: i64) {
        if let Some(previous) = self.jobs.lock().await.remove(&named_id) {
            previous.cancel();
        }
    }
}
