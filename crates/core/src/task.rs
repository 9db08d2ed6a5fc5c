//! Background task status
//!
//! `GET /task_status/{task_id}` answers `{status|state, result?: {path}}`. The status
//! field name varies and its casing is not reliable, so everything goes through
//! [`TaskStatus::normalize`]. Anything unrecognized is `Pending`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Paragraph id -> last known task status
pub type TaskStatusMap = HashMap<String, TaskStatus>;

/// Canonical task states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    Started,
    Success,
    Failure,
    Retry,
}

impl TaskStatus {
    /// Map a raw backend value onto a canonical state, case-insensitively
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.unwrap_or_default().trim().to_ascii_uppercase().as_str() {
            "PENDING" => TaskStatus::Pending,
            "STARTED" => TaskStatus::Started,
            "SUCCESS" => TaskStatus::Success,
            "FAILURE" => TaskStatus::Failure,
            "RETRY" => TaskStatus::Retry,
            _ => TaskStatus::Pending,
        }
    }

    /// No further polling is needed once a task reaches this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Started => "STARTED",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
            TaskStatus::Retry => "RETRY",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw body of the task status endpoint
///
/// Fields are kept loosely typed so a malformed body still deserializes
/// and degrades to `Pending`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub state: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl TaskStatusResponse {
    pub fn with_status(status: &str) -> Self {
        Self {
            status: Some(Value::String(status.to_string())),
            ..Default::default()
        }
    }

    pub fn with_result_path(mut self, path: &str) -> Self {
        self.result = Some(serde_json::json!({ "path": path }));
        self
    }

    /// `status` wins over `state`; non-string values count as missing
    pub fn normalized_status(&self) -> TaskStatus {
        let raw = match self.status.as_ref() {
            Some(Value::Null) | None => self.state.as_ref(),
            some => some,
        };
        TaskStatus::normalize(raw.and_then(Value::as_str))
    }

    /// Output path reported by a finished task, if any
    pub fn result_path(&self) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|r| r.get("path"))
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_mixed_case() {
        assert_eq!(TaskStatus::normalize(Some("success")), TaskStatus::Success);
        assert_eq!(TaskStatus::normalize(Some("Started")), TaskStatus::Started);
        assert_eq!(TaskStatus::normalize(Some("RETRY")), TaskStatus::Retry);
        assert_eq!(TaskStatus::normalize(Some("failure")), TaskStatus::Failure);
    }

    #[test]
    fn test_normalize_unknown_defaults_pending() {
        assert_eq!(TaskStatus::normalize(None), TaskStatus::Pending);
        assert_eq!(TaskStatus::normalize(Some("REVOKED")), TaskStatus::Pending);
        assert_eq!(TaskStatus::normalize(Some("")), TaskStatus::Pending);
    }

    #[test]
    fn test_state_field_fallback() {
        let resp: TaskStatusResponse =
            serde_json::from_str(r#"{"state": "success", "result": {"path": "/out/p1.wav"}}"#)
                .unwrap();
        assert_eq!(resp.normalized_status(), TaskStatus::Success);
        assert_eq!(resp.result_path(), Some("/out/p1.wav"));

        let resp: TaskStatusResponse =
            serde_json::from_str(r#"{"status": null, "state": "STARTED"}"#).unwrap();
        assert_eq!(resp.normalized_status(), TaskStatus::Started);
    }

    #[test]
    fn test_malformed_body_is_pending() {
        let resp: TaskStatusResponse =
            serde_json::from_str(r#"{"status": 42, "result": "not an object"}"#).unwrap();
        assert_eq!(resp.normalized_status(), TaskStatus::Pending);
        assert_eq!(resp.result_path(), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failure.is_terminal());
        assert!(!TaskStatus::Retry.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }
}
