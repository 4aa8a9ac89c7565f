//! Session configuration.
//!
//! Held in memory by the caller; the verifier never reads files or
//! environment variables to build it.

use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::poll::PollPolicy;
use crate::io::resolver::DEFAULT_MAX_ARTIFACT_BYTES;

/// Connection and timing settings for one verification session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the service, without the trailing `/runs`.
    pub base_url: String,

    /// Seconds to wait after submission before the first status probe.
    pub initial_delay_secs: u64,

    /// Seconds between status probes.
    pub poll_interval_secs: u64,

    /// Maximum number of status probes.
    pub max_attempts: u32,

    /// TCP connect timeout for every HTTP request.
    pub connect_timeout_secs: u64,

    /// Whole-request timeout for every HTTP request, artifact reads included.
    pub fetch_timeout_secs: u64,

    /// Largest artifact the resolver will read, in bytes.
    pub max_artifact_bytes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4545/ga4gh/wes/v1".to_string(),
            initial_delay_secs: 5,
            poll_interval_secs: 5,
            max_attempts: 12,
            connect_timeout_secs: 10,
            fetch_timeout_secs: 120,
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|err| anyhow!("base_url {:?} is not a URL: {err}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("base_url must use http or https"));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(anyhow!("connect_timeout_secs must be > 0"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(anyhow!("fetch_timeout_secs must be > 0"));
        }
        if self.max_artifact_bytes == 0 {
            return Err(anyhow!("max_artifact_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_attempts,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
