//! Error types for the schedir ecosystem.

use thiserror::Error;

use crate::reconcile::AmbiguousMerge;

/// Errors reported by the remote side (provider binary or its response).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Schedule '{0}' is not backed by a remote source")]
    NotRemote(String),
}

/// Errors that can occur in schedir operations.
#[derive(Error, Debug)]
pub enum SchedirError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    AmbiguousMerge(#[from] AmbiguousMerge),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Sync was cancelled by a newer request")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SchedirError {
    /// Whether the error means "the thing you pointed at is gone".
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchedirError::NotFound(_))
    }
}

/// Result type alias for schedir operations.
pub type SchedirResult<T> = Result<T, SchedirError>;
