//! Comparison of a fetched run record against its fixture.
//!
//! Four independent families are checked in one pass: the request echo, the
//! run log, the ordered task logs and the outputs. Every discrepancy becomes
//! a [`Finding`]; nothing short-circuits except a task log count mismatch,
//! which skips the positional comparison of that family only.

use std::collections::BTreeSet;

use tracing::{debug, instrument, warn};

use crate::core::digest::md5_hex;
use crate::core::fixture::{ExpectedLog, ExpectedRun};
use crate::core::reference::Reference;
use crate::core::report::{Entity, Finding, VerificationReport};
use crate::core::types::{LogEntry, RunRecord};
use crate::io::resolver::Resolve;

pub struct Verifier<'a, R: Resolve + ?Sized> {
    resolver: &'a R,
}

impl<'a, R: Resolve + ?Sized> Verifier<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    #[instrument(skip_all, fields(run_id = %record.run_id))]
    pub fn verify(&self, record: &RunRecord, expected: &ExpectedRun) -> VerificationReport {
        let mut report = VerificationReport::default();
        self.check_request(record, expected, &mut report);
        self.check_log(&Entity::RunLog, &record.run_log, &expected.run_log, &mut report);
        self.check_task_logs(&record.task_logs, &expected.task_logs, &mut report);
        self.check_outputs(record, expected, &mut report);

        if report.passed() {
            debug!(digests = report.digests_checked, "verification passed");
        } else {
            warn!(findings = report.findings.len(), "verification failed");
        }
        report
    }

    fn check_request(&self, record: &RunRecord, expected: &ExpectedRun, report: &mut VerificationReport) {
        let entity = Entity::Request;
        let echo = &record.request;
        let want = &expected.request;
        report.compare(&entity, "workflow_type", &want.workflow_type, &echo.workflow_type);
        report.compare(
            &entity,
            "workflow_type_version",
            &want.workflow_type_version,
            &echo.workflow_type_version,
        );
        report.compare(&entity, "workflow_url", &want.workflow_url, &echo.workflow_url);
    }

    fn check_log(
        &self,
        entity: &Entity,
        log: &LogEntry,
        expected: &ExpectedLog,
        report: &mut VerificationReport,
    ) {
        report.compare(entity, "name", &expected.name, &log.name);
        report.compare(entity, "cmd", &expected.cmd, &log.cmd);
        report.compare(entity, "exit_code", &Some(expected.exit_code), &log.exit_code);

        if let Some(want) = &expected.stdout_md5 {
            self.check_digest(entity, "stdout", log.stdout.as_deref(), want, report);
        }
        if let Some(want) = &expected.stderr_md5 {
            self.check_digest(entity, "stderr", log.stderr.as_deref(), want, report);
        }
    }

    fn check_task_logs(
        &self,
        logs: &[LogEntry],
        expected: &[ExpectedLog],
        report: &mut VerificationReport,
    ) {
        if logs.len() != expected.len() {
            report.push(Finding::CountMismatch {
                expected: expected.len(),
                actual: logs.len(),
            });
            return;
        }
        for (index, (log, want)) in logs.iter().zip(expected).enumerate() {
            self.check_log(&Entity::TaskLog { index }, log, want, report);
        }
    }

    fn check_outputs(&self, record: &RunRecord, expected: &ExpectedRun, report: &mut VerificationReport) {
        let actual = record.output_references();
        let actual_keys: BTreeSet<&str> = actual.keys().copied().collect();
        let expected_keys: BTreeSet<&str> = expected.outputs.keys().map(String::as_str).collect();

        for key in expected_keys.difference(&actual_keys) {
            report.push(Finding::MissingOutput {
                key: key.to_string(),
            });
        }
        for key in actual_keys.difference(&expected_keys) {
            report.push(Finding::UnexpectedOutput {
                key: key.to_string(),
            });
        }
        for key in expected_keys.intersection(&actual_keys) {
            let entity = Entity::Output {
                key: key.to_string(),
            };
            let reference = actual.get(key).map(String::as_str);
            let want = &expected.outputs[*key];
            self.check_digest(&entity, "value", reference, want, report);
        }
    }

    fn check_digest(
        &self,
        entity: &Entity,
        field: &str,
        raw_reference: Option<&str>,
        expected_md5: &str,
        report: &mut VerificationReport,
    ) {
        let Some(raw_reference) = raw_reference else {
            report.push(Finding::Unresolved {
                entity: entity.clone(),
                field: field.to_string(),
                reference: "<absent>".to_string(),
                reason: format!("record has no {field} reference"),
            });
            return;
        };

        let reference = Reference::classify(raw_reference);
        let bytes = match self.resolver.resolve(&reference) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%entity, field, reference = %reference, error = %err, "artifact unresolved");
                report.push(Finding::Unresolved {
                    entity: entity.clone(),
                    field: field.to_string(),
                    reference: reference.to_string(),
                    reason: error_chain(&err),
                });
                return;
            }
        };

        let actual_md5 = md5_hex(&bytes);
        report.digests_checked += 1;
        debug!(%entity, field, actual_md5, "digest computed");
        if actual_md5 != expected_md5 {
            report.push(Finding::Mismatch {
                entity: entity.clone(),
                field: format!("{field}_md5"),
                expected: expected_md5.to_string(),
                actual: actual_md5,
            });
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixture::ExpectedLog;
    use crate::test_support::{StaticResolver, hello_expected, hello_record, task_log};

    const HELLO_MD5: &str = "b1946ac92492d2347c6235b4d2611184";

    fn verify(record: &RunRecord, expected: &ExpectedRun, resolver: &StaticResolver) -> VerificationReport {
        Verifier::new(resolver).verify(record, expected)
    }

    #[test]
    fn matching_record_passes() {
        let (record, resolver) = hello_record();
        let report = verify(&record, &hello_expected(), &resolver);
        assert!(report.passed(), "{report}");
        // three task stdout + three task stderr + three outputs
        assert_eq!(report.digests_checked, 9);
    }

    #[test]
    fn single_byte_change_fails_with_actual_digest() {
        let (record, mut resolver) = hello_record();
        resolver.insert("file:///runs/r1/sayHello/stdout", b"hellO\n");
        let report = verify(&record, &hello_expected(), &resolver);
        assert_eq!(report.findings.len(), 1, "{report}");
        match &report.findings[0] {
            Finding::Mismatch {
                entity,
                field,
                expected,
                actual,
            } => {
                assert_eq!(entity, &Entity::TaskLog { index: 0 });
                assert_eq!(field, "stdout_md5");
                assert_eq!(expected, HELLO_MD5);
                assert_ne!(actual, HELLO_MD5);
                assert_eq!(actual, &md5_hex(b"hellO\n"));
            }
            other => panic!("expected mismatch, got {other}"),
        }
    }

    #[test]
    fn absent_expected_digest_skips_resolution() {
        let (mut record, resolver) = hello_record();
        // Unresolvable on purpose: the run log fixture does not check stdout.
        record.run_log.stdout = Some("file:///nowhere/stdout".to_string());
        record.run_log.stderr = None;
        let report = verify(&record, &hello_expected(), &resolver);
        assert!(report.passed(), "{report}");
    }

    #[test]
    fn command_order_matters() {
        let (mut record, resolver) = hello_record();
        let mut expected = hello_expected();
        expected.run_log.cmd = vec!["echo a".to_string(), "echo b".to_string()];
        record.run_log.cmd = vec!["echo b".to_string(), "echo a".to_string()];
        let report = verify(&record, &expected, &resolver);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].label(), "run_log.cmd");
    }

    #[test]
    fn exit_code_is_always_checked() {
        let (mut record, resolver) = hello_record();
        record.task_logs[1].exit_code = None;
        record.run_log.exit_code = Some(1);
        let report = verify(&record, &hello_expected(), &resolver);
        let labels: Vec<String> = report.findings.iter().map(Finding::label).collect();
        assert_eq!(labels, vec!["run_log.exit_code", "task_logs[1].exit_code"]);
    }

    #[test]
    fn swapped_tasks_report_positions_one_and_two() {
        let (mut record, resolver) = hello_record();
        record.task_logs.swap(1, 2);
        let report = verify(&record, &hello_expected(), &resolver);
        assert!(!report.passed());
        assert_eq!(report.findings_for(&Entity::TaskLog { index: 0 }).count(), 0);
        assert!(report.findings_for(&Entity::TaskLog { index: 1 }).count() > 0);
        assert!(report.findings_for(&Entity::TaskLog { index: 2 }).count() > 0);
        assert!(report.findings.iter().any(|finding| matches!(
            finding,
            Finding::Mismatch { entity: Entity::TaskLog { index: 1 }, field, .. } if field == "name"
        )));
    }

    #[test]
    fn task_count_mismatch_stops_positional_checks_only() {
        let (mut record, resolver) = hello_record();
        record.task_logs.truncate(2);
        record.request.workflow_type_version = "draft-2".to_string();
        let report = verify(&record, &hello_expected(), &resolver);
        let labels: Vec<String> = report.findings.iter().map(Finding::label).collect();
        assert_eq!(
            labels,
            vec!["request.workflow_type_version", "task_logs.count"]
        );
        assert!(report.findings.contains(&Finding::CountMismatch {
            expected: 3,
            actual: 2
        }));
        // outputs were still verified
        assert_eq!(report.digests_checked, 3);
    }

    #[test]
    fn output_key_sets_must_match_exactly() {
        let mut resolver = StaticResolver::default();
        resolver.insert("x", b"x");
        let mut expected = hello_expected();
        expected.task_logs.clear();
        expected.outputs.clear();
        expected.outputs.insert("x".to_string(), md5_hex(b"x"));

        let (mut record, _) = hello_record();
        record.task_logs.clear();
        record.outputs.clear();
        record.outputs.insert("x".to_string(), "x".into());
        record.outputs.insert("y".to_string(), "y".into());
        let report = verify(&record, &expected, &resolver);
        assert_eq!(
            report.findings,
            vec![Finding::UnexpectedOutput {
                key: "y".to_string()
            }]
        );

        expected.outputs.insert("y".to_string(), md5_hex(b"y"));
        record.outputs.remove("y");
        let report = verify(&record, &expected, &resolver);
        assert_eq!(
            report.findings,
            vec![Finding::MissingOutput {
                key: "y".to_string()
            }]
        );
    }

    #[test]
    fn unresolved_artifacts_do_not_stop_other_checks() {
        let (mut record, resolver) = hello_record();
        record.task_logs[0].stdout = Some("file:///runs/r1/missing".to_string());
        record.task_logs[2].stderr = None;
        let report = verify(&record, &hello_expected(), &resolver);
        let labels: Vec<String> = report.findings.iter().map(Finding::label).collect();
        assert_eq!(
            labels,
            vec![
                "task_logs[0].stdout.unresolved",
                "task_logs[2].stderr.unresolved"
            ]
        );
        assert_eq!(report.digests_checked, 7);
    }

    #[test]
    fn changed_output_content_is_attributed_to_its_key() {
        let (record, mut resolver) = hello_record();
        resolver.insert("file:///runs/r1/sayWorld/resultWorld.txt", b"world\n");
        let report = verify(&record, &hello_expected(), &resolver);
        let labels: Vec<String> = report.findings.iter().map(Finding::label).collect();
        assert_eq!(labels, vec!["outputs[helloWorld.sayWorld.resultWorld].value_md5"]);
    }

    #[test]
    fn literal_outputs_are_digested_directly() {
        let resolver = StaticResolver::default();
        let mut expected = hello_expected();
        expected.task_logs = vec![ExpectedLog::new("t", &[], 0)];
        expected.outputs.clear();
        expected
            .outputs
            .insert("greeting".to_string(), "5d41402abc4b2a76b9719d911017c592".to_string());

        let (mut record, _) = hello_record();
        record.task_logs = vec![task_log("t", &[], None, None)];
        record.outputs.clear();
        record.outputs.insert("greeting".to_string(), "hello".into());
        let report = verify(&record, &expected, &resolver);
        assert!(report.passed(), "{report}");
    }
}
