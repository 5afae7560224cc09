//! Provider protocol types.
//!
//! Defines the JSON protocol used for communication between schedir and
//! provider binaries over stdin/stdout: one request line in, one response
//! line out.

use serde::{Deserialize, Serialize};

use crate::model::ScheduleKind;

/// Commands that providers must implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    FetchNamedSchedule,
}

/// Request sent from schedir to a provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Params of [`Command::FetchNamedSchedule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchNamedScheduleParams {
    pub display_name: String,
    pub external_id: String,
    pub kind: ScheduleKind,
}

/// Response sent from a provider back to schedir.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T) -> serde_json::Result<String> {
        serde_json::to_string(&Response::Success { data })
    }
}

impl Response<()> {
    pub fn error(msg: &str) -> String {
        // A struct with one string field always serializes
        serde_json::to_string(&Response::<()>::Error {
            error: msg.to_string(),
        })
        .unwrap_or_else(|_| String::from(r#"{"status":"error","error":"unserializable error"}"#))
    }
}
