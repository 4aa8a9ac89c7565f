//! Pure decision table for the status poll loop.

use std::time::Duration;

use crate::core::types::RunState;

/// Timing and budget of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before the first probe so the run can leave the submission queue.
    pub initial_delay: Duration,
    /// Fixed wait between probes. Never grows.
    pub interval: Duration,
    /// Maximum number of probes.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            interval: Duration::from_secs(5),
            max_attempts: 12,
        }
    }
}

impl PollPolicy {
    /// Policy with no waiting, for tests and local stubs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            interval: Duration::ZERO,
            max_attempts,
        }
    }
}

/// What the poller does after observing `state` on probe `attempt` (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Complete,
    Failed,
    Wait,
    Exhausted,
}

pub fn decide(state: RunState, attempt: u32, max_attempts: u32) -> PollDecision {
    match state {
        RunState::Complete => PollDecision::Complete,
        RunState::ExecutorError => PollDecision::Failed,
        _ if attempt >= max_attempts => PollDecision::Exhausted,
        _ => PollDecision::Wait,
    }
}
