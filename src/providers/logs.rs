//! Pipeline execution log mock data source.
//!
//! Static run logs with deterministic durations, step output, and error
//! details. Runs are stored newest-first, which downstream bug-context
//! lookups rely on.

use serde_json::Value;

use crate::model::{ErrorDetail, ErrorSummary, PipelineLog, RunError, RunRecord, RunStatus, StepRecord};

/// Identifier fields checked, in priority order, when resolving a pipeline
/// key from a loosely shaped record.
const KEY_FIELDS: [&str; 4] = ["key", "planKey", "pipeline_key", "id"];

fn step(step: &str, status: RunStatus, duration_seconds: u64, output: &str) -> StepRecord {
    StepRecord {
        step: step.to_string(),
        status,
        duration_seconds,
        output: output.to_string(),
    }
}

fn run_error(step: &str, message: &str) -> RunError {
    RunError {
        step: step.to_string(),
        message: message.to_string(),
    }
}

fn alpha_log() -> PipelineLog {
    PipelineLog {
        pipeline_key: "PROJ-PLAN1".to_string(),
        pipeline_name: "Project Alpha - Build and Deploy".to_string(),
        total_runs: 3,
        runs: vec![
            RunRecord {
                run_id: "run-001".to_string(),
                build_number: 123,
                status: RunStatus::Success,
                started_at: "2025-09-17T10:15:30Z".to_string(),
                completed_at: Some("2025-09-17T10:21:55Z".to_string()),
                duration_seconds: 385,
                triggered_by: "admin".to_string(),
                branch: "main".to_string(),
                commit_hash: "abc123def456".to_string(),
                errors: vec![],
                steps: vec![
                    step("checkout", RunStatus::Success, 15, "Successfully checked out main branch"),
                    step("build", RunStatus::Success, 240, "Build completed successfully"),
                    step("test", RunStatus::Success, 85, "All 3 tests passed"),
                    step("deploy", RunStatus::Success, 45, "Deployment to staging completed"),
                ],
            },
            RunRecord {
                run_id: "run-002".to_string(),
                build_number: 122,
                status: RunStatus::Success,
                started_at: "2025-09-17T09:30:12Z".to_string(),
                completed_at: Some("2025-09-17T09:37:48Z".to_string()),
                duration_seconds: 456,
                triggered_by: "developer".to_string(),
                branch: "main".to_string(),
                commit_hash: "xyz789abc123".to_string(),
                errors: vec![],
                steps: vec![
                    step("checkout", RunStatus::Success, 18, "Successfully checked out main branch"),
                    step("build", RunStatus::Success, 285, "Build completed successfully"),
                    step("test", RunStatus::Success, 98, "All 3 tests passed"),
                    step("deploy", RunStatus::Success, 55, "Deployment to staging completed"),
                ],
            },
            RunRecord {
                run_id: "run-003".to_string(),
                build_number: 121,
                status: RunStatus::Success,
                started_at: "2025-09-16T16:45:20Z".to_string(),
                completed_at: Some("2025-09-16T16:52:35Z".to_string()),
                duration_seconds: 435,
                triggered_by: "scheduler".to_string(),
                branch: "main".to_string(),
                commit_hash: "def456ghi789".to_string(),
                errors: vec![],
                steps: vec![
                    step("checkout", RunStatus::Success, 12, "Successfully checked out main branch"),
                    step("build", RunStatus::Success, 265, "Build completed successfully"),
                    step("test", RunStatus::Success, 105, "All 3 tests passed"),
                    step("deploy", RunStatus::Success, 53, "Deployment to staging completed"),
                ],
            },
        ],
        error: None,
    }
}

fn beta_log() -> PipelineLog {
    PipelineLog {
        pipeline_key: "PROJ-PLAN2".to_string(),
        pipeline_name: "Project Beta - Testing Pipeline".to_string(),
        total_runs: 2,
        runs: vec![
            RunRecord {
                run_id: "run-087".to_string(),
                build_number: 87,
                status: RunStatus::Failed,
                started_at: "2025-09-16T14:20:15Z".to_string(),
                completed_at: Some("2025-09-16T14:22:40Z".to_string()),
                duration_seconds: 145,
                triggered_by: "developer".to_string(),
                branch: "feature/new-tests".to_string(),
                commit_hash: "def456ghi789".to_string(),
                errors: vec![
                    run_error(
                        "test",
                        "Test 'test_user_validation' failed: AssertionError: Expected 'valid' but got 'invalid'",
                    ),
                    run_error("test", "1 out of 3 tests failed"),
                ],
                steps: vec![
                    step("checkout", RunStatus::Success, 10, "Successfully checked out feature/new-tests branch"),
                    step("build", RunStatus::Success, 95, "Build completed successfully"),
                    step("test", RunStatus::Failed, 40, "Test execution failed: 2 passed, 1 failed"),
                ],
            },
            RunRecord {
                run_id: "run-086".to_string(),
                build_number: 86,
                status: RunStatus::Success,
                started_at: "2025-09-16T13:15:45Z".to_string(),
                completed_at: Some("2025-09-16T13:18:50Z".to_string()),
                duration_seconds: 185,
                triggered_by: "developer".to_string(),
                branch: "main".to_string(),
                commit_hash: "ghi789jkl012".to_string(),
                errors: vec![],
                steps: vec![
                    step("checkout", RunStatus::Success, 8, "Successfully checked out main branch"),
                    step("build", RunStatus::Success, 120, "Build completed successfully"),
                    step("test", RunStatus::Success, 57, "All 3 tests passed"),
                ],
            },
        ],
        error: None,
    }
}

fn gamma_log() -> PipelineLog {
    PipelineLog {
        pipeline_key: "PROJ-PLAN3".to_string(),
        pipeline_name: "Project Gamma - Integration Tests".to_string(),
        total_runs: 3,
        runs: vec![
            RunRecord {
                run_id: "run-201".to_string(),
                build_number: 201,
                status: RunStatus::InProgress,
                started_at: "2025-09-17T11:45:30Z".to_string(),
                completed_at: None,
                duration_seconds: 0,
                triggered_by: "scheduler".to_string(),
                branch: "main".to_string(),
                commit_hash: "ghi789jkl012".to_string(),
                errors: vec![],
                steps: vec![
                    step("checkout", RunStatus::Success, 15, "Successfully checked out main branch"),
                    step("build", RunStatus::InProgress, 0, "Build in progress..."),
                ],
            },
            RunRecord {
                run_id: "run-200".to_string(),
                build_number: 200,
                status: RunStatus::Failed,
                started_at: "2025-09-17T08:30:20Z".to_string(),
                completed_at: Some("2025-09-17T08:44:15Z".to_string()),
                duration_seconds: 835,
                triggered_by: "developer".to_string(),
                branch: "develop".to_string(),
                commit_hash: "jkl012mno345".to_string(),
                errors: vec![
                    run_error(
                        "integration-test",
                        "Database connection timeout: Unable to connect to test database after 30 seconds",
                    ),
                    run_error(
                        "integration-test",
                        "Service 'user-service' failed health check: HTTP 503 Service Unavailable",
                    ),
                ],
                steps: vec![
                    step("checkout", RunStatus::Success, 12, "Successfully checked out develop branch"),
                    step("build", RunStatus::Success, 320, "Build completed successfully"),
                    step("unit-test", RunStatus::Success, 180, "All 25 unit tests passed"),
                    step("integration-test", RunStatus::Failed, 323, "Integration tests failed: 7 passed, 5 failed"),
                ],
            },
            RunRecord {
                run_id: "run-199".to_string(),
                build_number: 199,
                status: RunStatus::Success,
                started_at: "2025-09-16T20:15:10Z".to_string(),
                completed_at: Some("2025-09-16T20:29:25Z".to_string()),
                duration_seconds: 855,
                triggered_by: "scheduler".to_string(),
                branch: "main".to_string(),
                commit_hash: "mno345pqr678".to_string(),
                errors: vec![],
                steps: vec![
                    step("checkout", RunStatus::Success, 10, "Successfully checked out main branch"),
                    step("build", RunStatus::Success, 345, "Build completed successfully"),
                    step("unit-test", RunStatus::Success, 195, "All 25 unit tests passed"),
                    step("integration-test", RunStatus::Success, 305, "All 12 integration tests passed"),
                ],
            },
        ],
        error: None,
    }
}

/// Static execution logs for a pipeline key.
///
/// Unknown keys return an empty log rather than an error.
pub fn get_pipeline_logs(pipeline_key: &str) -> PipelineLog {
    match pipeline_key {
        "PROJ-PLAN1" => alpha_log(),
        "PROJ-PLAN2" => beta_log(),
        "PROJ-PLAN3" => gamma_log(),
        _ => PipelineLog {
            pipeline_key: pipeline_key.to_string(),
            pipeline_name: format!("Unknown Pipeline ({pipeline_key})"),
            total_runs: 0,
            runs: vec![],
            error: None,
        },
    }
}

/// Resolve a pipeline key from a loosely shaped record.
///
/// The first candidate field present decides the outcome: a string value is
/// the key, a keyed object (`{"key": ...}`) is unwrapped one level, numbers
/// are rendered as strings. Records without any candidate field resolve to
/// `None`.
pub fn resolve_pipeline_key(record: &Value) -> Option<String> {
    let obj = record.as_object()?;

    for field in KEY_FIELDS {
        let Some(value) = obj.get(field) else {
            continue;
        };
        return match value {
            Value::String(key) => Some(key.clone()),
            Value::Number(key) => Some(key.to_string()),
            Value::Object(nested) => nested
                .get("key")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            _ => None,
        };
    }

    None
}

/// Fetch logs for multiple pipeline records, one log per record in input
/// order. Records with no resolvable key yield a placeholder log with a
/// diagnostic marker; this never fails.
pub fn get_all_logs(pipelines: &[Value]) -> Vec<PipelineLog> {
    pipelines
        .iter()
        .map(|record| match resolve_pipeline_key(record) {
            Some(key) => get_pipeline_logs(&key),
            None => PipelineLog {
                pipeline_key: "UNKNOWN".to_string(),
                pipeline_name: "Unknown Pipeline".to_string(),
                total_runs: 0,
                runs: vec![],
                error: Some("No valid pipeline key found in pipeline data".to_string()),
            },
        })
        .collect()
}

/// Extract error statistics from one pipeline's logs, covering FAILED runs
/// only.
pub fn get_error_summary(pipeline_logs: &PipelineLog) -> ErrorSummary {
    let total_runs = pipeline_logs.runs.len();
    let mut failed_runs = 0;
    let mut total_errors = 0;
    let mut error_details = Vec::new();

    for run in &pipeline_logs.runs {
        if run.status != RunStatus::Failed {
            continue;
        }
        failed_runs += 1;
        total_errors += run.errors.len();

        for error in &run.errors {
            error_details.push(ErrorDetail {
                run_id: run.run_id.clone(),
                build_number: run.build_number,
                step: error.step.clone(),
                message: error.message.clone(),
                timestamp: run.started_at.clone(),
            });
        }
    }

    let success_rate = if total_runs > 0 {
        let rate = (total_runs - failed_runs) as f64 / total_runs as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    } else {
        0.0
    };

    ErrorSummary {
        pipeline_key: pipeline_logs.pipeline_key.clone(),
        pipeline_name: pipeline_logs.pipeline_name.clone(),
        total_runs,
        failed_runs,
        success_rate,
        total_errors,
        error_details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixture_run_and_error_totals() {
        let logs = [alpha_log(), beta_log(), gamma_log()];
        let runs: usize = logs.iter().map(|l| l.runs.len()).sum();
        let errors: usize = logs
            .iter()
            .flat_map(|l| &l.runs)
            .map(|r| r.errors.len())
            .sum();
        assert_eq!(runs, 8);
        assert_eq!(errors, 4);
    }

    #[test]
    fn test_unknown_key_returns_empty_log() {
        let logs = get_pipeline_logs("PROJ-MISSING");
        assert_eq!(logs.total_runs, 0);
        assert!(logs.runs.is_empty());
        assert!(logs.pipeline_name.contains("Unknown Pipeline"));
    }

    #[test]
    fn test_resolve_key_direct() {
        let record = json!({"key": "PROJ-PLAN1"});
        assert_eq!(resolve_pipeline_key(&record).as_deref(), Some("PROJ-PLAN1"));
    }

    #[test]
    fn test_resolve_key_nested_plan_key() {
        let record = json!({"planKey": {"key": "PROJ-PLAN2"}});
        assert_eq!(resolve_pipeline_key(&record).as_deref(), Some("PROJ-PLAN2"));
    }

    #[test]
    fn test_resolve_key_priority_order() {
        let record = json!({"id": "fallback-id", "key": "PROJ-PLAN3"});
        assert_eq!(resolve_pipeline_key(&record).as_deref(), Some("PROJ-PLAN3"));
    }

    #[test]
    fn test_resolve_key_missing() {
        let record = json!({"label": "no identifier here"});
        assert_eq!(resolve_pipeline_key(&record), None);
    }

    #[test]
    fn test_get_all_logs_preserves_input_order() {
        let records = vec![json!({"key": "PROJ-PLAN2"}), json!({"key": "PROJ-PLAN1"})];
        let logs = get_all_logs(&records);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].pipeline_key, "PROJ-PLAN2");
        assert_eq!(logs[1].pipeline_key, "PROJ-PLAN1");
    }

    #[test]
    fn test_get_all_logs_unresolvable_record() {
        let logs = get_all_logs(&[json!({"name": "nameless"})]);
        assert_eq!(logs[0].pipeline_key, "UNKNOWN");
        assert_eq!(logs[0].total_runs, 0);
        assert!(logs[0].error.is_some());
    }

    #[test]
    fn test_error_summary_all_successful() {
        let summary = get_error_summary(&alpha_log());
        assert_eq!(summary.success_rate, 100.0);
        assert_eq!(summary.total_errors, 0);
        assert!(summary.error_details.is_empty());
    }

    #[test]
    fn test_error_summary_one_of_two_failed() {
        let summary = get_error_summary(&beta_log());
        assert_eq!(summary.total_runs, 2);
        assert_eq!(summary.failed_runs, 1);
        assert_eq!(summary.success_rate, 50.0);
        assert_eq!(summary.total_errors, 2);
        assert_eq!(summary.error_details[0].run_id, "run-087");
    }

    #[test]
    fn test_error_summary_empty_log() {
        let summary = get_error_summary(&get_pipeline_logs("PROJ-MISSING"));
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.total_runs, 0);
    }
}
