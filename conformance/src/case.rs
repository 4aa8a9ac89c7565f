//! Case file parsing and validation.
//!
//! Cases are TOML files naming a workflow to submit and the fixtures its run
//! must match. See `conformance/cases/` for examples.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use verifier::core::digest::is_md5_hex;
use verifier::core::fixture::{ExpectedLog, ExpectedRequest, ExpectedRun};
use verifier::core::types::RunRequest;

/// A parsed case file: what to submit and what the finished run must look like.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseFile {
    pub case: CaseMeta,
    pub request: CaseRequest,
    #[serde(default)]
    pub config: CaseConfig,
    pub run_log: ExpectedLog,
    #[serde(default)]
    pub task_logs: Vec<ExpectedLog>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

/// Case metadata.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    #[serde(default)]
    pub description: String,
}

/// Workflow submission parameters. Also the expected request echo.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseRequest {
    pub workflow_type: String,
    pub workflow_type_version: String,
    pub workflow_url: String,
    /// JSON object text (default: `{}`).
    #[serde(default = "empty_params")]
    pub workflow_params: String,
}

fn empty_params() -> String {
    "{}".to_string()
}

/// Session overrides for slow or fast workflows.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CaseConfig {
    pub initial_delay_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub fetch_timeout_secs: Option<u64>,
}

impl CaseFile {
    /// Load and validate a case file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read case {}", path.display()))?;
        let case: CaseFile =
            toml::from_str(&contents).with_context(|| format!("parse case {}", path.display()))?;
        case.validate()
            .with_context(|| format!("validate case {}", path.display()))?;
        let stem = path.file_stem().and_then(|stem| stem.to_str());
        if stem != Some(case.case.id.as_str()) {
            bail!(
                "case file {} must be named {}.toml to match case.id",
                path.display(),
                case.case.id
            );
        }
        Ok(case)
    }

    #[cfg(test)]
    pub fn parse_str(contents: &str) -> Result<Self> {
        let case: CaseFile = toml::from_str(contents).context("parse case")?;
        case.validate()?;
        Ok(case)
    }

    fn validate(&self) -> Result<()> {
        validate_case_id(&self.case.id)?;
        let request = &self.request;
        if request.workflow_type.trim().is_empty() {
            bail!("request.workflow_type must be non-empty");
        }
        if request.workflow_type_version.trim().is_empty() {
            bail!("request.workflow_type_version must be non-empty");
        }
        if request.workflow_url.trim().is_empty() {
            bail!("request.workflow_url must be non-empty");
        }
        serde_json::from_str::<serde_json::Value>(&request.workflow_params)
            .context("request.workflow_params must be JSON")?;
        if let Some(max_attempts) = self.config.max_attempts
            && max_attempts == 0
        {
            bail!("config.max_attempts must be > 0");
        }
        if let Some(fetch_timeout_secs) = self.config.fetch_timeout_secs
            && fetch_timeout_secs == 0
        {
            bail!("config.fetch_timeout_secs must be > 0");
        }
        validate_log(&self.run_log).context("run_log invalid")?;
        for (index, log) in self.task_logs.iter().enumerate() {
            validate_log(log).with_context(|| format!("task_logs[{}] invalid", index))?;
        }
        for (key, digest) in &self.outputs {
            if key.trim().is_empty() {
                bail!("output key must be non-empty");
            }
            validate_digest(digest).with_context(|| format!("outputs.{key} invalid"))?;
        }
        Ok(())
    }

    pub fn run_request(&self) -> RunRequest {
        RunRequest {
            workflow_type: self.request.workflow_type.clone(),
            workflow_type_version: self.request.workflow_type_version.clone(),
            workflow_url: self.request.workflow_url.clone(),
            workflow_params: self.request.workflow_params.clone(),
        }
    }

    pub fn expected_run(&self) -> ExpectedRun {
        ExpectedRun {
            request: ExpectedRequest {
                workflow_type: self.request.workflow_type.clone(),
                workflow_type_version: self.request.workflow_type_version.clone(),
                workflow_url: self.request.workflow_url.clone(),
            },
            run_log: self.run_log.clone(),
            task_logs: self.task_logs.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

fn validate_log(log: &ExpectedLog) -> Result<()> {
    if log.name.trim().is_empty() {
        bail!("name must be non-empty");
    }
    if let Some(digest) = &log.stdout_md5 {
        validate_digest(digest).context("stdout_md5")?;
    }
    if let Some(digest) = &log.stderr_md5 {
        validate_digest(digest).context("stderr_md5")?;
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<()> {
    if !is_md5_hex(digest) {
        return Err(anyhow!(
            "digest {digest:?} must be 32 lowercase hex characters"
        ));
    }
    Ok(())
}

/// Discover and load all case files from a directory.
///
/// Returns cases sorted by id. Errors if duplicate ids are found.
pub fn discover_cases(dir: &Path) -> Result<Vec<CaseFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read cases dir {}", dir.display()))? {
        let entry = entry.context("read case entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        cases.push(CaseFile::load(&path)?);
    }
    cases.sort_by(|left, right| left.case.id.cmp(&right.case.id));
    for pair in cases.windows(2) {
        if pair[0].case.id == pair[1].case.id {
            return Err(anyhow!("duplicate case.id {}", pair[0].case.id));
        }
    }
    Ok(cases)
}

pub fn validate_case_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("case.id must be non-empty");
    }
    if id.contains('/') || id.contains('\\') {
        bail!("case.id must not contain path separators");
    }
    if id.contains("..") {
        bail!("case.id must not contain '..'");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("case.id must use [a-z0-9_-] only");
    }
    Ok(())
}
