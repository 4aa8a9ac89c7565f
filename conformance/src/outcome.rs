use serde::{Deserialize, Serialize};
use verifier::error::SessionError;
use verifier::session::SessionOutcome;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Mismatch,
    RunFailed,
    Timeout,
    Error,
}

pub fn classify_outcome(result: &Result<SessionOutcome, SessionError>) -> Outcome {
    match result {
        Ok(_) => Outcome::Pass,
        Err(SessionError::Mismatch { .. }) => Outcome::Mismatch,
        Err(SessionError::RunFailed { .. }) => Outcome::RunFailed,
        Err(SessionError::Timeout { .. }) => Outcome::Timeout,
        Err(
            SessionError::Submission { .. }
            | SessionError::Consistency { .. }
            | SessionError::Fetch { .. },
        ) => Outcome::Error,
    }
}
