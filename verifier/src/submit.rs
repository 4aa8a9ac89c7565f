//! Run submission.

use tracing::{info, instrument};

use crate::core::types::{RunCreated, RunId, RunRequest};
use crate::error::SessionError;
use crate::io::transport::WesTransport;

/// Submit `request` once and return the id the service assigned.
///
/// There is no retry: any failure aborts the session.
#[instrument(skip_all, fields(workflow_url = %request.workflow_url))]
pub fn submit_run<T: WesTransport + ?Sized>(
    transport: &T,
    request: &RunRequest,
) -> Result<RunId, SessionError> {
    let body = transport
        .create_run(&request.form_fields())
        .map_err(|err| SessionError::Submission {
            reason: format!("{err:#}"),
        })?;
    let created: RunCreated =
        serde_json::from_str(&body).map_err(|err| SessionError::Submission {
            reason: format!("decode run creation response: {err}"),
        })?;
    let raw = created.run_id.ok_or_else(|| SessionError::Submission {
        reason: "response has no run_id".to_string(),
    })?;
    let run_id = RunId::new(raw).map_err(|err| SessionError::Submission {
        reason: err.to_string(),
    })?;
    info!(run_id = %run_id, "run submitted");
    Ok(run_id)
}
