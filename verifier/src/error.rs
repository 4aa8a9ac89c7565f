//! Session and artifact resolution errors.

use std::path::PathBuf;

use crate::core::report::VerificationReport;
use crate::core::types::{RunId, RunState};

/// Fatal outcome of a verification session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The creation request failed or returned no usable run id.
    #[error("run submission failed: {reason}")]
    Submission { reason: String },

    /// The poll budget ran out before a terminal state was seen.
    #[error("run {run_id} did not finish within {attempts} status probes")]
    Timeout { run_id: RunId, attempts: u32 },

    /// The service reported a terminal failure state.
    #[error("run {run_id} ended in {state}")]
    RunFailed { run_id: RunId, state: RunState },

    /// The service returned data for a different run or state than expected.
    #[error("run {run_id}: {field} is {actual}, expected {expected}")]
    Consistency {
        run_id: RunId,
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// A status probe or the run record could not be read or decoded.
    #[error("run {run_id}: {reason}")]
    Fetch { run_id: RunId, reason: String },

    /// The record was fetched but does not match the fixture.
    #[error("run {run_id} failed verification: {report}")]
    Mismatch {
        run_id: RunId,
        report: Box<VerificationReport>,
    },
}

impl SessionError {
    /// The verification report, when the session got far enough to produce one.
    pub fn report(&self) -> Option<&VerificationReport> {
        match self {
            SessionError::Mismatch { report, .. } => Some(report),
            _ => None,
        }
    }

    /// The run this error concerns; `None` when submission itself failed.
    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            SessionError::Submission { .. } => None,
            SessionError::Timeout { run_id, .. }
            | SessionError::RunFailed { run_id, .. }
            | SessionError::Consistency { run_id, .. }
            | SessionError::Fetch { run_id, .. }
            | SessionError::Mismatch { run_id, .. } => Some(run_id),
        }
    }
}

/// Failure to turn an artifact reference into bytes.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{url} does not name a local file")]
    InvalidFileUrl { url: String },

    #[error("request {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("read body of {url}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{url} exceeds the {limit} byte artifact limit")]
    TooLarge { url: String, limit: u64 },
}
