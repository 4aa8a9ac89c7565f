//! Wire types for the run-execution contract (`/runs` API).

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier the execution service assigns to a submitted run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            bail!("run id must be non-empty");
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution state reported by the service.
///
/// Only `Complete` and `ExecutorError` end polling. Unrecognized strings
/// decode as `Unknown` and keep the poller waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Queued,
    Initializing,
    Running,
    Paused,
    Complete,
    ExecutorError,
    SystemError,
    Canceled,
    Canceling,
    #[serde(other)]
    Unknown,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Complete | RunState::ExecutorError)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Unknown => "UNKNOWN",
            RunState::Queued => "QUEUED",
            RunState::Initializing => "INITIALIZING",
            RunState::Running => "RUNNING",
            RunState::Paused => "PAUSED",
            RunState::Complete => "COMPLETE",
            RunState::ExecutorError => "EXECUTOR_ERROR",
            RunState::SystemError => "SYSTEM_ERROR",
            RunState::Canceled => "CANCELED",
            RunState::Canceling => "CANCELING",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body of `POST /runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunCreated {
    pub run_id: Option<String>,
}

/// Response body of `GET /runs/{id}/status`. Rebuilt on every probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: RunId,
    pub state: RunState,
}

/// Parameters of a run submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub workflow_type: String,
    pub workflow_type_version: String,
    pub workflow_url: String,
    /// JSON text, sent verbatim as the `workflow_params` form field.
    pub workflow_params: String,
}

impl RunRequest {
    /// Form fields for `POST /runs`, in submission order.
    pub fn form_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("workflow_type", self.workflow_type.as_str()),
            ("workflow_type_version", self.workflow_type_version.as_str()),
            ("workflow_url", self.workflow_url.as_str()),
            ("workflow_params", self.workflow_params.as_str()),
        ]
    }
}

/// Submission parameters as echoed back inside a run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEcho {
    pub workflow_type: String,
    pub workflow_type_version: String,
    pub workflow_url: String,
    #[serde(default)]
    pub workflow_params: Option<Value>,
}

/// One executed unit of work: the run itself or a single task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cmd: Vec<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Reference to stdout content (usually a `file://` or `http(s)://` URL).
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

/// Full record of a finished run (`GET /runs/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub state: RunState,
    pub request: RequestEcho,
    pub run_log: LogEntry,
    pub task_logs: Vec<LogEntry>,
    pub outputs: BTreeMap<String, Value>,
}

impl RunRecord {
    /// Output values as reference strings.
    ///
    /// Strings are used as-is; any other JSON value becomes its compact JSON
    /// text and is treated as literal content.
    pub fn output_references(&self) -> BTreeMap<&str, String> {
        self.outputs
            .iter()
            .map(|(key, value)| {
                let reference = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (key.as_str(), reference)
            })
            .collect()
    }
}
