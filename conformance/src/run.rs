//! Case execution orchestration.
//!
//! Builds a session from the case, runs it once, and captures the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, instrument};
use verifier::config::SessionConfig;
use verifier::session::VerificationSession;

use crate::case::CaseFile;
use crate::outcome::{Outcome, classify_outcome};
use crate::results::{CaptureInput, capture_results};

/// Result of running a single case.
#[derive(Debug)]
pub struct RunOutcome {
    /// Unique identifier for this conformance run.
    pub eval_run_id: String,
    /// Path to the results directory.
    pub results_dir: PathBuf,
    /// Classified outcome.
    pub outcome: Outcome,
    /// Findings in the verification report, zero unless the outcome is a mismatch.
    pub findings: usize,
}

/// Run a case end-to-end: submit, poll, fetch, verify, capture.
///
/// A session that fails is a classified outcome, not an error; only setup and
/// result capture failures are returned as `Err`.
#[instrument(skip_all, fields(case_id = %case.case.id, base_url = %config.base_url))]
pub fn run_case(
    results_base: &Path,
    case_path: &Path,
    case: &CaseFile,
    config: SessionConfig,
) -> Result<RunOutcome> {
    info!("case run started");

    let session = VerificationSession::over_http(config, case.run_request(), case.expected_run())
        .context("build session")?;

    let started_at = Utc::now();
    let eval_run_id = eval_run_id(started_at);
    let mut probes = 0;
    let result = session.run_with_observer(|attempt, status| {
        probes = attempt;
        debug!(attempt, state = %status.state, "status probe");
    });
    let finished_at = Utc::now();

    let outcome = classify_outcome(&result);
    let duration = finished_at - started_at;
    info!(
        outcome = ?outcome,
        probes,
        duration_secs = duration.num_milliseconds() as f64 / 1000.0,
        "session finished"
    );

    let (run_id, error, report) = match &result {
        Ok(done) => (Some(done.run_id.as_str()), None, Some(&done.report)),
        Err(err) => (
            err.run_id().map(|run_id| run_id.as_str()),
            Some(err.to_string()),
            err.report(),
        ),
    };
    let findings = report.map_or(0, |report| report.findings.len());

    let capture_input = CaptureInput {
        case_id: &case.case.id,
        case_path,
        eval_run_id: &eval_run_id,
        base_url: &session.config().base_url,
        run_id,
        outcome,
        probes,
        error,
        report,
        started_at,
        finished_at,
    };
    let results_dir = capture_results(results_base, &capture_input).context("capture results")?;

    info!(outcome = ?outcome, results_dir = %results_dir.display(), "case run complete");

    Ok(RunOutcome {
        eval_run_id,
        results_dir,
        outcome,
        findings,
    })
}

fn eval_run_id(started_at: chrono::DateTime<Utc>) -> String {
    format!("eval-{}", started_at.format("%Y%m%d_%H%M%S_%3f"))
}
