//! DevTools wire messages used by the page source.
//!
//! Only the handful of shapes tablewatch exchanges with the browser are
//! modelled; everything else stays as [`Value`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing command. Page-level commands carry the flattened session id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command<'a> {
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// Anything the browser sends back: a reply (has `id`) or an event.
#[derive(Debug, Deserialize)]
pub struct Incoming {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<RemoteError>,
    pub method: Option<String>,
}

impl Incoming {
    /// The reply payload, or the remote error.
    pub fn into_result(self) -> Result<Value, RemoteError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
}

/// Entry of `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
}

impl TargetInfo {
    pub fn is_page(&self) -> bool {
        self.kind == "page"
    }
}

/// Reply of `PUT /json/new`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTarget {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Reply of `GET /json/version`; its keys are not camelCase.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub ws_url: String,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
