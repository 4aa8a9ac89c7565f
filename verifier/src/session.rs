//! One end-to-end verification: submit, poll, fetch, verify.

use tracing::{info, instrument};

use crate::config::SessionConfig;
use crate::core::fixture::ExpectedRun;
use crate::core::report::VerificationReport;
use crate::core::types::{RunId, RunRecord, RunRequest, RunStatus};
use crate::error::SessionError;
use crate::fetch::fetch_run_record;
use crate::io::resolver::{ArtifactResolver, Resolve};
use crate::io::transport::{HttpTransport, WesTransport};
use crate::poll::{PollOutcome, wait_for_completion};
use crate::submit::submit_run;
use crate::verify::Verifier;

/// Result of a session that passed verification.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub run_id: RunId,
    pub status: RunStatus,
    /// Status probes made before the run completed.
    pub attempts: u32,
    pub record: RunRecord,
    pub report: VerificationReport,
}

/// Verification of a single run, owning every collaborator it uses.
///
/// Sessions share nothing; verifying several runs means several sessions.
pub struct VerificationSession<T, R> {
    transport: T,
    resolver: R,
    config: SessionConfig,
    request: RunRequest,
    expected: ExpectedRun,
}

impl VerificationSession<HttpTransport, ArtifactResolver> {
    /// Session talking HTTP to `config.base_url`.
    pub fn over_http(
        config: SessionConfig,
        request: RunRequest,
        expected: ExpectedRun,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        let resolver = ArtifactResolver::new(&config)?;
        Ok(Self::new(transport, resolver, config, request, expected))
    }
}

impl<T: WesTransport, R: Resolve> VerificationSession<T, R> {
    pub fn new(
        transport: T,
        resolver: R,
        config: SessionConfig,
        request: RunRequest,
        expected: ExpectedRun,
    ) -> Self {
        Self {
            transport,
            resolver,
            config,
            request,
            expected,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the full pipeline once.
    ///
    /// Returns `SessionError::Mismatch` with the full report when the record
    /// does not match the fixture.
    pub fn run(&self) -> Result<SessionOutcome, SessionError> {
        self.run_with_observer(|_, _| {})
    }

    /// Like [`run`](Self::run), reporting every status probe to `on_probe`.
    #[instrument(skip_all, fields(workflow_url = %self.request.workflow_url))]
    pub fn run_with_observer<F: FnMut(u32, &RunStatus)>(
        &self,
        on_probe: F,
    ) -> Result<SessionOutcome, SessionError> {
        let run_id = submit_run(&self.transport, &self.request)?;
        let PollOutcome { status, attempts } = wait_for_completion(
            &self.transport,
            &run_id,
            &self.config.poll_policy(),
            on_probe,
        )?;
        let record = fetch_run_record(&self.transport, &status)?;
        let report = Verifier::new(&self.resolver).verify(&record, &self.expected);

        if !report.passed() {
            return Err(SessionError::Mismatch {
                run_id,
                report: Box::new(report),
            });
        }
        info!(run_id = %run_id, attempts, digests = report.digests_checked, "run verified");
        Ok(SessionOutcome {
            run_id,
            status,
            attempts,
            record,
            report,
        })
    }
}
