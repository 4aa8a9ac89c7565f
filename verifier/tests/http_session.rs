//! Full verification sessions over real HTTP against an in-process fake
//! service, with artifacts split between local files, remote URLs and
//! literal output values.

mod support;

use std::collections::{BTreeMap, VecDeque};
use std::fs;

use serde_json::json;
use url::Url;

use support::{FakeWes, Script};
use verifier::config::SessionConfig;
use verifier::core::digest::md5_hex;
use verifier::core::fixture::{ExpectedLog, ExpectedRequest, ExpectedRun};
use verifier::core::report::{Entity, Finding};
use verifier::core::types::RunRequest;
use verifier::error::SessionError;
use verifier::session::VerificationSession;
use verifier::test_support::HELLO_WORKFLOW_URL;

const HELLO_STDOUT_MD5: &str = "b1946ac92492d2347c6235b4d2611184";
const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

fn config(wes: &FakeWes, max_attempts: u32) -> SessionConfig {
    SessionConfig {
        base_url: wes.base_url(),
        initial_delay_secs: 0,
        poll_interval_secs: 0,
        max_attempts,
        connect_timeout_secs: 5,
        fetch_timeout_secs: 5,
        max_artifact_bytes: 1024,
    }
}

fn request() -> RunRequest {
    RunRequest {
        workflow_type: "WDL".to_string(),
        workflow_type_version: "1.0".to_string(),
        workflow_url: HELLO_WORKFLOW_URL.to_string(),
        workflow_params: "{}".to_string(),
    }
}

fn expected() -> ExpectedRun {
    ExpectedRun {
        request: ExpectedRequest {
            workflow_type: "WDL".to_string(),
            workflow_type_version: "1.0".to_string(),
            workflow_url: HELLO_WORKFLOW_URL.to_string(),
        },
        run_log: ExpectedLog::new("helloWorld", &["echo \"hello\"", "echo \"world\""], 0),
        task_logs: vec![
            ExpectedLog::new("helloWorld.sayHello.step-0", &["echo \"hello\""], 0)
                .with_stdout_md5(HELLO_STDOUT_MD5)
                .with_stderr_md5(EMPTY_MD5),
            ExpectedLog::new("helloWorld.sayWorld.step-0", &["echo \"world\""], 0)
                .with_stdout_md5(&md5_hex(b"world\n"))
                .with_stderr_md5(EMPTY_MD5),
        ],
        outputs: BTreeMap::from([
            (
                "helloWorld.sayHello.resultHello".to_string(),
                "5d41402abc4b2a76b9719d911017c592".to_string(),
            ),
            (
                "helloWorld.sayWorld.out".to_string(),
                md5_hex(b"world\n"),
            ),
        ]),
    }
}

/// Workspace with local stdout/stderr files for the first task.
struct Artifacts {
    _dir: tempfile::TempDir,
    stdout_url: String,
    stderr_url: String,
}

fn local_artifacts(stdout: &[u8]) -> Artifacts {
    let dir = tempfile::tempdir().expect("tempdir");
    let stdout_path = dir.path().join("stdout");
    let stderr_path = dir.path().join("stderr");
    fs::write(&stdout_path, stdout).expect("write stdout");
    fs::write(&stderr_path, b"").expect("write stderr");
    Artifacts {
        stdout_url: Url::from_file_path(&stdout_path).expect("url").to_string(),
        stderr_url: Url::from_file_path(&stderr_path).expect("url").to_string(),
        _dir: dir,
    }
}

fn record(run_id: &str, local: &Artifacts) -> String {
    json!({
        "run_id": run_id,
        "state": "COMPLETE",
        "request": {
            "workflow_type": "WDL",
            "workflow_type_version": "1.0",
            "workflow_url": HELLO_WORKFLOW_URL,
            "workflow_params": {}
        },
        "run_log": {
            "name": "helloWorld",
            "cmd": ["echo \"hello\"", "echo \"world\""],
            "stdout": "$ENDPOINT/artifacts/run-stdout",
            "stderr": "$ENDPOINT/artifacts/run-stderr",
            "exit_code": 0
        },
        "task_logs": [
            {
                "name": "helloWorld.sayHello.step-0",
                "cmd": ["echo \"hello\""],
                "stdout": local.stdout_url,
                "stderr": local.stderr_url,
                "exit_code": 0
            },
            {
                "name": "helloWorld.sayWorld.step-0",
                "cmd": ["echo \"world\""],
                "stdout": "$ENDPOINT/artifacts/world-stdout",
                "stderr": "$ENDPOINT/artifacts/world-stderr",
                "exit_code": 0
            }
        ],
        "outputs": {
            "helloWorld.sayHello.resultHello": "hello",
            "helloWorld.sayWorld.out": "$ENDPOINT/artifacts/world-out"
        }
    })
    .to_string()
}

fn remote_artifacts() -> BTreeMap<String, Vec<u8>> {
    BTreeMap::from([
        ("world-stdout".to_string(), b"world\n".to_vec()),
        ("world-stderr".to_string(), Vec::new()),
        ("world-out".to_string(), b"world\n".to_vec()),
    ])
}

fn start(local: &Artifacts, states: &[&str], artifacts: BTreeMap<String, Vec<u8>>) -> FakeWes {
    FakeWes::start(
        "run-1",
        Script {
            states: states.iter().map(|state| state.to_string()).collect::<VecDeque<_>>(),
            record: record("run-1", local),
            artifacts,
            ..Script::default()
        },
    )
}

#[test]
fn verifies_run_with_file_remote_and_literal_artifacts() {
    let local = local_artifacts(b"hello\n");
    let wes = start(&local, &["QUEUED", "RUNNING", "COMPLETE"], remote_artifacts());

    let session =
        VerificationSession::over_http(config(&wes, 12), request(), expected()).expect("session");
    let outcome = session.run().expect("verified");

    assert_eq!(outcome.run_id.as_str(), wes.run_id);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(wes.probes(), 3);
    // two task streams each, plus two outputs
    assert_eq!(outcome.report.digests_checked, 6);

    let forms = wes.forms();
    assert_eq!(forms.len(), 1);
    assert!(forms[0].contains("workflow_type=WDL"));
    assert!(forms[0].contains("workflow_type_version=1.0"));
    assert!(forms[0].contains("workflow_params=%7B%7D"));
}

#[test]
fn changed_local_stdout_fails_with_actual_digest() {
    let local = local_artifacts(b"hellO\n");
    let wes = start(&local, &["COMPLETE"], remote_artifacts());

    let session =
        VerificationSession::over_http(config(&wes, 12), request(), expected()).expect("session");
    let err = session.run().expect_err("mismatch");
    let report = err.report().expect("report");
    assert_eq!(
        report.findings,
        vec![Finding::Mismatch {
            entity: Entity::TaskLog { index: 0 },
            field: "stdout_md5".to_string(),
            expected: HELLO_STDOUT_MD5.to_string(),
            actual: md5_hex(b"hellO\n"),
        }]
    );
}

#[test]
fn missing_remote_artifact_is_reported_with_other_checks_intact() {
    let local = local_artifacts(b"hello\n");
    let mut artifacts = remote_artifacts();
    artifacts.remove("world-out");
    let wes = start(&local, &["COMPLETE"], artifacts);

    let session =
        VerificationSession::over_http(config(&wes, 12), request(), expected()).expect("session");
    let err = session.run().expect_err("unresolved output");
    let report = err.report().expect("report");
    assert_eq!(report.findings.len(), 1, "{report}");
    match &report.findings[0] {
        Finding::Unresolved {
            entity,
            field,
            reason,
            ..
        } => {
            assert_eq!(
                entity,
                &Entity::Output {
                    key: "helloWorld.sayWorld.out".to_string()
                }
            );
            assert_eq!(field, "value");
            assert!(reason.contains("HTTP 404"), "{reason}");
        }
        other => panic!("expected unresolved artifact, got {other}"),
    }
    assert_eq!(report.digests_checked, 5);
}

#[test]
fn oversized_remote_artifact_is_unresolved_not_read() {
    let local = local_artifacts(b"hello\n");
    let mut artifacts = remote_artifacts();
    artifacts.insert("world-out".to_string(), vec![b'w'; 4096]);
    let wes = start(&local, &["COMPLETE"], artifacts);

    let session =
        VerificationSession::over_http(config(&wes, 12), request(), expected()).expect("session");
    let err = session.run().expect_err("artifact too large");
    let report = err.report().expect("report");
    let labels: Vec<String> = report.findings.iter().map(Finding::label).collect();
    assert_eq!(labels, vec!["outputs[helloWorld.sayWorld.out].value.unresolved"]);
    match &report.findings[0] {
        Finding::Unresolved { reason, .. } => {
            assert!(reason.contains("1024 byte artifact limit"), "{reason}");
        }
        other => panic!("expected unresolved artifact, got {other}"),
    }
}

#[test]
fn run_that_never_finishes_times_out() {
    let local = local_artifacts(b"hello\n");
    let wes = start(&local, &["QUEUED", "RUNNING"], remote_artifacts());

    let session =
        VerificationSession::over_http(config(&wes, 4), request(), expected()).expect("session");
    match session.run() {
        Err(SessionError::Timeout { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(wes.probes(), 4);
}

#[test]
fn executor_error_fails_without_waiting_out_budget() {
    let local = local_artifacts(b"hello\n");
    let wes = start(&local, &["RUNNING", "EXECUTOR_ERROR"], remote_artifacts());

    let session =
        VerificationSession::over_http(config(&wes, 12), request(), expected()).expect("session");
    let err = session.run().expect_err("run failed");
    assert!(matches!(err, SessionError::RunFailed { .. }));
    assert_eq!(wes.probes(), 2);
}

#[test]
fn rejected_submission_is_fatal() {
    let wes = FakeWes::start(
        "run-1",
        Script {
            create: Some((500, "boom".to_string())),
            ..Script::default()
        },
    );

    let session =
        VerificationSession::over_http(config(&wes, 12), request(), expected()).expect("session");
    let err = session.run().expect_err("submission failed");
    assert!(matches!(err, SessionError::Submission { .. }));
    assert!(err.to_string().contains("HTTP 500"));
    assert_eq!(wes.probes(), 0);
}
