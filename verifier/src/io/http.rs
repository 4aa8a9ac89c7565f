//! Shared blocking HTTP client construction.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, Response};

/// Build a client that never blocks longer than the configured timeouts.
pub fn create_http_client(connect_timeout: Duration, request_timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .user_agent(concat!("verifier/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build HTTP client")
}

/// Fail with a descriptive error unless the response is 2xx.
pub fn ensure_success(response: &Response, context: &str) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        bail!(
            "{}: HTTP {} - {}",
            context,
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        );
    }
    Ok(())
}
