//! Sync pipeline: at most one fetch-and-reconcile unit in flight per named
//! schedule, cancellable at every suspension point.

mod cancel;
mod jobs;
mod pipeline;

pub use cancel::{CancelToken, FinishGuard};
pub use jobs::SyncJobs;
pub use pipeline::{SyncOutcome, run_sync};
