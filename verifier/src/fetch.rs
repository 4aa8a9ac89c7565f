//! Retrieval of the full run record once polling has finished.

use tracing::{debug, instrument};

use crate::core::types::{RunRecord, RunStatus};
use crate::error::SessionError;
use crate::io::transport::WesTransport;

/// Fetch the record for the run named by `last_status` and check that it
/// describes the same run in the same state.
///
/// A disagreement is a correlation bug on the service side and is never
/// retried.
#[instrument(skip_all, fields(run_id = %last_status.run_id))]
pub fn fetch_run_record<T: WesTransport + ?Sized>(
    transport: &T,
    last_status: &RunStatus,
) -> Result<RunRecord, SessionError> {
    let run_id = &last_status.run_id;
    let body = transport
        .run_record(run_id)
        .map_err(|err| SessionError::Fetch {
            run_id: run_id.clone(),
            reason: format!("run record: {err:#}"),
        })?;
    let record: RunRecord = serde_json::from_str(&body).map_err(|err| SessionError::Fetch {
        run_id: run_id.clone(),
        reason: format!("decode run record: {err}"),
    })?;

    if &record.run_id != run_id {
        return Err(SessionError::Consistency {
            run_id: run_id.clone(),
            field: "record.run_id",
            expected: run_id.to_string(),
            actual: record.run_id.to_string(),
        });
    }
    if record.state != last_status.state {
        return Err(SessionError::Consistency {
            run_id: run_id.clone(),
            field: "record.state",
            expected: last_status.state.to_string(),
            actual: record.state.to_string(),
        });
    }

    debug!(
        task_logs = record.task_logs.len(),
        outputs = record.outputs.len(),
        "run record fetched"
    );
    Ok(record)
}
