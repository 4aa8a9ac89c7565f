//! CLI command implementations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::case::{CaseFile, discover_cases, validate_case_id};
use crate::config::{apply_case_config, load_session_config};
use crate::report::aggregate;
use crate::run::run_case;

fn conformance_dir(repo_root: &Path) -> PathBuf {
    repo_root.join("conformance")
}

/// List all available cases.
pub fn list_cases(repo_root: &Path) -> Result<()> {
    let cases_dir = conformance_dir(repo_root).join("cases");
    let cases = discover_cases(&cases_dir)?;
    for case in cases {
        if case.case.description.is_empty() {
            println!("{}", case.case.id);
        } else {
            println!("{}  {}", case.case.id, case.case.description);
        }
    }
    Ok(())
}

/// Run a case by id (optionally multiple times).
pub fn run_case_by_id(
    repo_root: &Path,
    case_id: &str,
    runs: u32,
    base_url: Option<&str>,
) -> Result<()> {
    validate_case_id(case_id)?;
    let root = conformance_dir(repo_root);
    let case_path = root.join("cases").join(format!("{case_id}.toml"));
    if !case_path.exists() {
        bail!("case {} not found at {}", case_id, case_path.display());
    }
    let case = CaseFile::load(&case_path).context("load case")?;
    let shared = load_session_config(&root.join("config.toml"))?;
    let config = apply_case_config(shared, &case.config, base_url).context("session config")?;
    debug!(case_id, runs, base_url = %config.base_url, "case loaded");

    info!(case_id, runs, "starting runs");
    let results_base = root.join("results");
    for run_num in 1..=runs {
        debug!(case_id, run_num, runs, "starting run");
        let outcome =
            run_case(&results_base, &case_path, &case, config.clone()).context("run case")?;
        println!(
            "run: case={} eval_run_id={} outcome={:?} findings={} results={}",
            case_id,
            outcome.eval_run_id,
            outcome.outcome,
            outcome.findings,
            outcome.results_dir.display()
        );
    }
    Ok(())
}

/// Show aggregated results for a case.
pub fn report_case(repo_root: &Path, case_id: &str) -> Result<()> {
    validate_case_id(case_id)?;
    let results_dir = conformance_dir(repo_root).join("results").join(case_id);
    let (summary, warnings) = aggregate(&results_dir)?;
    println!("report: case={} runs={}", case_id, summary.runs);
    println!(
        "report: pass={} mismatch={} run_failed={} timeout={} error={}",
        summary.pass, summary.mismatch, summary.run_failed, summary.timeout, summary.error
    );
    if let Some(avg) = summary.avg_duration_secs {
        println!("report: avg_duration_secs={:.2}", avg);
    }
    for (label, count) in summary.finding_counts {
        println!("report: finding {} {}/{}", label, count, summary.runs);
    }
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(())
}

/// Remove results for a case.
pub fn clean_case(repo_root: &Path, case_id: &str) -> Result<()> {
    validate_case_id(case_id)?;
    let case_results = conformance_dir(repo_root).join("results").join(case_id);
    if case_results.exists() {
        std::fs::remove_dir_all(&case_results)
            .with_context(|| format!("remove {}", case_results.display()))?;
    }

    println!("clean: case={} results={}", case_id, case_results.display());
    Ok(())
}
