//! Bounded wait for a submitted run to reach a terminal state.

use std::thread;

use tracing::{debug, info, instrument, warn};

use crate::core::poll::{PollDecision, PollPolicy, decide};
use crate::core::types::{RunId, RunStatus};
use crate::error::SessionError;
use crate::io::transport::WesTransport;

/// Final status observed by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub status: RunStatus,
    /// Number of status probes made, the completing probe included.
    pub attempts: u32,
}

/// Probe `run_id` until it is `COMPLETE`, fails, or the budget runs out.
///
/// Blocks the calling thread for `initial_delay` and then for `interval`
/// between probes. `on_probe` sees every observed status.
#[instrument(skip_all, fields(run_id = %run_id, max_attempts = policy.max_attempts))]
pub fn wait_for_completion<T, F>(
    transport: &T,
    run_id: &RunId,
    policy: &PollPolicy,
    mut on_probe: F,
) -> Result<PollOutcome, SessionError>
where
    T: WesTransport + ?Sized,
    F: FnMut(u32, &RunStatus),
{
    if !policy.initial_delay.is_zero() {
        debug!(delay_ms = policy.initial_delay.as_millis() as u64, "initial delay");
        thread::sleep(policy.initial_delay);
    }

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let status = probe(transport, run_id)?;
        on_probe(attempt, &status);
        debug!(attempt, state = %status.state, "status probe");

        match decide(status.state, attempt, policy.max_attempts) {
            PollDecision::Complete => {
                info!(attempts = attempt, "run complete");
                return Ok(PollOutcome {
                    status,
                    attempts: attempt,
                });
            }
            PollDecision::Failed => {
                warn!(attempts = attempt, state = %status.state, "run failed");
                return Err(SessionError::RunFailed {
                    run_id: run_id.clone(),
                    state: status.state,
                });
            }
            PollDecision::Exhausted => {
                warn!(attempts = attempt, state = %status.state, "poll budget exhausted");
                return Err(SessionError::Timeout {
                    run_id: run_id.clone(),
                    attempts: attempt,
                });
            }
            PollDecision::Wait => {
                if !policy.interval.is_zero() {
                    thread::sleep(policy.interval);
                }
            }
        }
    }
}

fn probe<T: WesTransport + ?Sized>(transport: &T, run_id: &RunId) -> Result<RunStatus, SessionError> {
    let body = transport
        .run_status(run_id)
        .map_err(|err| SessionError::Fetch {
            run_id: run_id.clone(),
            reason: format!("status probe: {err:#}"),
        })?;
    let status: RunStatus = serde_json::from_str(&body).map_err(|err| SessionError::Fetch {
        run_id: run_id.clone(),
        reason: format!("decode status: {err}"),
    })?;
    if &status.run_id != run_id {
        return Err(SessionError::Consistency {
            run_id: run_id.clone(),
            field: "status.run_id",
            expected: run_id.to_string(),
            actual: status.run_id.to_string(),
        });
    }
    Ok(status)
}
