//! Session configuration merging.
//!
//! Starts from `conformance/config.toml` (or defaults), then applies
//! case-specific overrides and the command-line base URL.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use verifier::config::SessionConfig;

use crate::case::CaseConfig;

/// Load the shared session config, falling back to defaults when absent.
pub fn load_session_config(path: &Path) -> Result<SessionConfig> {
    if !path.exists() {
        return Ok(SessionConfig::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parse config {}", path.display()))
}

/// Apply case overrides and an optional base URL to the shared config.
pub fn apply_case_config(
    mut base: SessionConfig,
    overrides: &CaseConfig,
    base_url: Option<&str>,
) -> Result<SessionConfig> {
    if let Some(initial_delay_secs) = overrides.initial_delay_secs {
        base.initial_delay_secs = initial_delay_secs;
    }
    if let Some(poll_interval_secs) = overrides.poll_interval_secs {
        base.poll_interval_secs = poll_interval_secs;
    }
    if let Some(max_attempts) = overrides.max_attempts {
        base.max_attempts = max_attempts;
    }
    if let Some(fetch_timeout_secs) = overrides.fetch_timeout_secs {
        base.fetch_timeout_secs = fetch_timeout_secs;
    }
    if let Some(base_url) = base_url {
        base.base_url = base_url.to_string();
    }
    base.validate()?;
    Ok(base)
}
