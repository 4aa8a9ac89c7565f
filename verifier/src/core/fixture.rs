//! Hand-authored expectations used as the verification oracle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Expected values for one log entry.
///
/// `None` digests are not checked. Name, command sequence and exit code are
/// always compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedLog {
    pub name: String,
    pub cmd: Vec<String>,
    #[serde(default)]
    pub stdout_md5: Option<String>,
    #[serde(default)]
    pub stderr_md5: Option<String>,
    pub exit_code: i32,
}

impl ExpectedLog {
    pub fn new(name: &str, cmd: &[&str], exit_code: i32) -> Self {
        Self {
            name: name.to_string(),
            cmd: cmd.iter().map(|part| part.to_string()).collect(),
            stdout_md5: None,
            stderr_md5: None,
            exit_code,
        }
    }

    pub fn with_stdout_md5(mut self, digest: &str) -> Self {
        self.stdout_md5 = Some(digest.to_string());
        self
    }

    pub fn with_stderr_md5(mut self, digest: &str) -> Self {
        self.stderr_md5 = Some(digest.to_string());
        self
    }
}

/// Expected submission echo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedRequest {
    pub workflow_type: String,
    pub workflow_type_version: String,
    pub workflow_url: String,
}

/// Complete oracle for one run: request echo, run log, ordered task logs and
/// output digests keyed by output name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedRun {
    pub request: ExpectedRequest,
    pub run_log: ExpectedLog,
    #[serde(default)]
    pub task_logs: Vec<ExpectedLog>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}
