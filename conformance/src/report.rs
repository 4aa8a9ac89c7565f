use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use verifier::core::report::VerificationReport;

use crate::outcome::Outcome;
use crate::results::EvalMeta;

#[derive(Debug, Default)]
pub struct ReportSummary {
    pub runs: usize,
    pub pass: usize,
    pub mismatch: usize,
    pub run_failed: usize,
    pub timeout: usize,
    pub error: usize,
    pub avg_duration_secs: Option<f64>,
    /// Finding label to the number of runs that reported it.
    pub finding_counts: BTreeMap<String, usize>,
}

pub fn load_run_dirs(case_results_dir: &Path) -> Result<Vec<PathBuf>> {
    if !case_results_dir.exists() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(case_results_dir)
        .with_context(|| format!("read {}", case_results_dir.display()))?
    {
        let entry = entry.context("read entry")?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub fn aggregate(case_results_dir: &Path) -> Result<(ReportSummary, Vec<String>)> {
    let mut summary = ReportSummary::default();
    let mut warnings = Vec::new();

    for run_dir in load_run_dirs(case_results_dir)? {
        let meta_path = run_dir.join("meta.json");
        let report_path = run_dir.join("report.json");

        let meta: EvalMeta = match fs::read_to_string(&meta_path)
            .with_context(|| format!("read {}", meta_path.display()))
            .and_then(|contents| serde_json::from_str(&contents).context("parse meta"))
        {
            Ok(meta) => meta,
            Err(err) => {
                warnings.push(format!(
                    "skip {}: meta.json invalid ({err})",
                    run_dir.display()
                ));
                continue;
            }
        };

        let report: Option<VerificationReport> = if report_path.exists() {
            match fs::read_to_string(&report_path)
                .with_context(|| format!("read {}", report_path.display()))
                .and_then(|contents| serde_json::from_str(&contents).context("parse report"))
            {
                Ok(report) => Some(report),
                Err(err) => {
                    warnings.push(format!(
                        "skip {}: report.json invalid ({err})",
                        run_dir.display()
                    ));
                    continue;
                }
            }
        } else {
            None
        };

        summary.runs += 1;
        match meta.outcome {
            Outcome::Pass => summary.pass += 1,
            Outcome::Mismatch => summary.mismatch += 1,
            Outcome::RunFailed => summary.run_failed += 1,
            Outcome::Timeout => summary.timeout += 1,
            Outcome::Error => summary.error += 1,
        }

        summary.avg_duration_secs = Some(match summary.avg_duration_secs {
            None => meta.duration_secs,
            Some(avg) => {
                let total = avg * (summary.runs as f64 - 1.0) + meta.duration_secs;
                total / summary.runs as f64
            }
        });

        if let Some(report) = &report {
            update_finding_counts(&mut summary.finding_counts, report);
        }
    }

    Ok((summary, warnings))
}

fn update_finding_counts(counts: &mut BTreeMap<String, usize>, report: &VerificationReport) {
    let mut labels: Vec<String> = report.findings.iter().map(|finding| finding.label()).collect();
    labels.sort();
    labels.dedup();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
}
