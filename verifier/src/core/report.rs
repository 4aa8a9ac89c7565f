//! Verification findings and the report that collects them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The part of a run record a finding is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Request,
    RunLog,
    TaskLog { index: usize },
    Output { key: String },
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Request => f.write_str("request"),
            Entity::RunLog => f.write_str("run_log"),
            Entity::TaskLog { index } => write!(f, "task_logs[{index}]"),
            Entity::Output { key } => write!(f, "outputs[{key}]"),
        }
    }
}

/// One discrepancy between a run record and its fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Finding {
    /// A field holds a different value than expected.
    Mismatch {
        entity: Entity,
        field: String,
        expected: String,
        actual: String,
    },
    /// Task log sequence has the wrong length; positional checks were skipped.
    CountMismatch { expected: usize, actual: usize },
    /// An expected output key is absent from the record.
    MissingOutput { key: String },
    /// The record holds an output key the fixture does not name.
    UnexpectedOutput { key: String },
    /// Artifact bytes could not be retrieved, so the digest was not compared.
    Unresolved {
        entity: Entity,
        field: String,
        reference: String,
        reason: String,
    },
}

impl Finding {
    /// Short label used when aggregating findings across runs.
    pub fn label(&self) -> String {
        match self {
            Finding::Mismatch { entity, field, .. } => format!("{entity}.{field}"),
            Finding::CountMismatch { .. } => "task_logs.count".to_string(),
            Finding::MissingOutput { key } => format!("outputs[{key}].missing"),
            Finding::UnexpectedOutput { key } => format!("outputs[{key}].unexpected"),
            Finding::Unresolved { entity, field, .. } => format!("{entity}.{field}.unresolved"),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Mismatch {
                entity,
                field,
                expected,
                actual,
            } => write!(f, "{entity}.{field}: expected {expected}, got {actual}"),
            Finding::CountMismatch { expected, actual } => {
                write!(f, "task_logs: expected {expected} entries, got {actual}")
            }
            Finding::MissingOutput { key } => write!(f, "outputs: missing key {key:?}"),
            Finding::UnexpectedOutput { key } => write!(f, "outputs: unexpected key {key:?}"),
            Finding::Unresolved {
                entity,
                field,
                reference,
                reason,
            } => write!(f, "{entity}.{field}: cannot resolve {reference}: {reason}"),
        }
    }
}

/// Everything the verifier found for one run record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub findings: Vec<Finding>,
    /// Number of digests actually computed and compared.
    pub digests_checked: usize,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Record a field mismatch when `expected != actual`.
    ///
    /// Strings are stored as-is; other values as compact JSON.
    pub fn compare<T: PartialEq + Serialize>(
        &mut self,
        entity: &Entity,
        field: &str,
        expected: &T,
        actual: &T,
    ) {
        if expected != actual {
            self.push(Finding::Mismatch {
                entity: entity.clone(),
                field: field.to_string(),
                expected: render(expected),
                actual: render(actual),
            });
        }
    }

    /// Findings attributed to `entity`, in report order.
    pub fn findings_for<'a>(&'a self, entity: &'a Entity) -> impl Iterator<Item = &'a Finding> {
        self.findings.iter().filter(move |finding| match finding {
            Finding::Mismatch { entity: e, .. } | Finding::Unresolved { entity: e, .. } => {
                e == entity
            }
            _ => false,
        })
    }
}

fn render<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(text)) => text,
        Ok(other) => other.to_string(),
        Err(err) => format!("<unrenderable: {err}>"),
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "passed ({} digests checked)", self.digests_checked);
        }
        write!(f, "{} finding(s)", self.findings.len())?;
        for finding in &self.findings {
            write!(f, "\n  - {finding}")?;
        }
        Ok(())
    }
}
