//! Transport abstraction for the run-execution service.
//!
//! The [`WesTransport`] trait returns raw response bodies so decoding, and
//! the error taxonomy that goes with it, stays with the stage that asked.
//! Tests use scripted transports that replay canned bodies.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::{debug, instrument};

use crate::config::SessionConfig;
use crate::core::types::RunId;
use crate::io::http::{create_http_client, ensure_success};

/// The three calls a verification session makes against the service.
pub trait WesTransport {
    /// `POST /runs` with a form-encoded body. Returns the response body.
    fn create_run(&self, form: &[(&str, &str)]) -> Result<String>;
    /// `GET /runs/{id}/status`.
    fn run_status(&self, run_id: &RunId) -> Result<String>;
    /// `GET /runs/{id}`.
    fn run_record(&self, run_id: &RunId) -> Result<String>;
}

/// Blocking HTTP implementation of [`WesTransport`].
pub struct HttpTransport {
    client: Client,
    runs_url: String,
}

impl HttpTransport {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let client = create_http_client(config.connect_timeout(), config.fetch_timeout())?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            runs_url: format!("{}/runs", base_url.trim_end_matches('/')),
        }
    }

    pub fn runs_url(&self) -> &str {
        &self.runs_url
    }

    fn get_text(&self, url: &str) -> Result<String> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?;
        ensure_success(&response, &format!("GET {url}"))?;
        response
            .text()
            .with_context(|| format!("read body of GET {url}"))
    }
}

impl WesTransport for HttpTransport {
    #[instrument(skip_all, fields(url = %self.runs_url))]
    fn create_run(&self, form: &[(&str, &str)]) -> Result<String> {
        let response = self
            .client
            .post(&self.runs_url)
            .form(form)
            .send()
            .with_context(|| format!("POST {}", self.runs_url))?;
        ensure_success(&response, &format!("POST {}", self.runs_url))?;
        response.text().context("read run creation body")
    }

    fn run_status(&self, run_id: &RunId) -> Result<String> {
        self.get_text(&format!("{}/{}/status", self.runs_url, run_id))
    }

    fn run_record(&self, run_id: &RunId) -> Result<String> {
        self.get_text(&format!("{}/{}", self.runs_url, run_id))
    }
}
