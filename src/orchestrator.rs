//! Workflow orchestration.
//!
//! Drives the four analysis stages in sequence and assembles the traceable
//! workflow envelope. Failures anywhere in the stages are caught once at
//! this boundary and converted into an error-status result; the workflow
//! never propagates an error to the caller.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{debug, error, info};
use serde::Serialize;
use serde_json::Value;

use crate::ai::Completion;
use crate::analyzer;
use crate::error::Result;
use crate::model::{PipelineAnalysis, PipelineDescriptor, PipelineLog, Report, Severity};
use crate::normalize;
use crate::providers::{bamboo, logs};
use crate::report;

const WORKFLOW_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInfo {
    pub start_time: String,
    pub end_time: String,
    pub execution_time_seconds: f64,
    pub status: String,
    pub version: String,
    pub steps_completed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInputs {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_plan_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_plans: Option<Vec<PipelineDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_fetched_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step1Plans {
    pub pipelines_found: usize,
    pub pipeline_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDigest {
    pub pipeline_key: String,
    pub runs_count: usize,
    pub has_errors: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step2Logs {
    pub logs_retrieved: usize,
    pub total_runs: usize,
    pub logs_summary: Vec<LogDigest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDigest {
    pub pipeline_key: String,
    pub error_count: usize,
    pub recommendation_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step3Analysis {
    pub analyses_completed: usize,
    pub analysis_summary: Vec<AnalysisDigest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step4Reporting {
    pub report_generated: bool,
    pub stats_computed: bool,
    pub bugs_found: usize,
    pub markdown_length: usize,
}

/// Intermediate results from each stage. Serializes as an empty object on
/// the error path.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowProcessing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step1_plans: Option<Step1Plans>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step2_logs: Option<Step2Logs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step3_analysis: Option<Step3Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step4_reporting: Option<Step4Reporting>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOutputs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipelines: Option<Vec<PipelineDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<PipelineLog>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyses: Option<Vec<PipelineAnalysis>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ExecutionSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBreakdown {
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCategories {
    pub healthy_pipelines: Vec<String>,
    pub warning_pipelines: Vec<String>,
    pub critical_pipelines: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub avg_pipeline_duration_minutes: f64,
    pub success_rate_percent: f64,
}

/// Execution-level health rollup derived from the analyses and the report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub overall_health: String,
    pub health_emoji: String,
    pub execution_time_seconds: f64,
    pub pipelines_analyzed: usize,
    pub total_runs_analyzed: usize,
    pub total_errors_found: usize,
    pub critical_issues: usize,
    pub pipeline_health_breakdown: HealthBreakdown,
    pub pipeline_categories: PipelineCategories,
    pub performance_metrics: PerformanceMetrics,
    pub quick_summary: String,
}

/// The top-level workflow envelope: metadata, inputs, per-stage processing
/// detail, and final outputs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub workflow_info: WorkflowInfo,
    pub inputs: WorkflowInputs,
    pub processing: WorkflowProcessing,
    pub outputs: WorkflowOutputs,
    pub question: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    pub plan_source: String,
    pub log_source: String,
    pub analyzer: String,
    pub reporting: String,
    pub orchestrator: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    pub status: String,
    pub timestamp: String,
    pub components: ComponentStatus,
    pub version: String,
    pub ready: bool,
}

struct StageData {
    raw_plan_data: Value,
    plans: Vec<PipelineDescriptor>,
    all_logs: Vec<PipelineLog>,
    analyses: Vec<PipelineAnalysis>,
    report: Report,
}

/// Coordinates the four-stage analysis workflow.
///
/// The AI capability is an explicit, caller-owned dependency; `None` routes
/// every AI attempt to the deterministic fallback path.
pub struct Orchestrator {
    ai: Option<Arc<dyn Completion>>,
}

impl Orchestrator {
    pub fn new(ai: Option<Arc<dyn Completion>>) -> Self {
        Self { ai }
    }

    /// Execute the complete pipeline analysis workflow.
    ///
    /// Always returns a `WorkflowResult`: on success with full traceability
    /// and `stepsCompleted = 4`, on failure with an error status and empty
    /// processing/outputs sections.
    pub async fn run(&self, question: &str) -> WorkflowResult {
        let start_time = Utc::now();
        let timer = Instant::now();
        info!("Starting pipeline analysis for question: '{question}'");

        match self.run_stages().await {
            Ok(stages) => {
                let end_time = Utc::now();
                let execution_time = round2(timer.elapsed().as_secs_f64());
                info!("Pipeline analysis completed successfully ({execution_time}s)");
                assemble_result(question, stages, start_time.to_rfc3339(), end_time.to_rfc3339(), execution_time)
            }
            Err(e) => {
                let end_time = Utc::now();
                let execution_time = round2(timer.elapsed().as_secs_f64());
                error!("Workflow failed after {execution_time} seconds: {e}");
                error_result(
                    question,
                    start_time.to_rfc3339(),
                    end_time.to_rfc3339(),
                    execution_time,
                    e.to_string(),
                )
            }
        }
    }

    async fn run_stages(&self) -> Result<StageData> {
        debug!("Step 1: Fetching plans...");
        let raw_plan_data = bamboo::get_bamboo_plans();
        let plans = normalize::normalize_plans(&raw_plan_data);
        debug!("Retrieved {} pipelines", plans.len());

        debug!("Step 2: Fetching pipeline logs...");
        let plan_records = plans
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<Value>, _>>()?;
        let all_logs = logs::get_all_logs(&plan_records);
        let total_runs: usize = all_logs.iter().map(|l| l.runs.len()).sum();
        debug!("Retrieved logs for {total_runs} total runs across all pipelines");

        debug!("Step 3: Analyzing pipelines...");
        let analyses = analyzer::analyze_all(self.ai.as_deref(), &all_logs).await;
        debug!("Completed analysis for {} pipelines", analyses.len());

        debug!("Step 4: Generating executive report...");
        let report = report::aggregate_and_report(self.ai.as_deref(), &analyses, &all_logs).await;
        info!(
            "Analysis complete: {} errors found across {} pipelines",
            report.stats.errors_total,
            analyses.len()
        );

        Ok(StageData {
            raw_plan_data,
            plans,
            all_logs,
            analyses,
            report,
        })
    }

    /// Run the full workflow and reduce it to a one-line status message.
    pub async fn quick_health_check(&self) -> String {
        let result = self.run("Health check test").await;

        if result.workflow_info.status == "success" {
            let pipelines = result
                .outputs
                .report
                .as_ref()
                .map(|report| report.stats.pipelines_total)
                .unwrap_or(0);
            format!("✅ Healthy - {pipelines} pipelines analyzed successfully")
        } else {
            format!(
                "⚠️ Issues detected - {}",
                result
                    .workflow_info
                    .error_message
                    .unwrap_or_else(|| "Unknown error".to_string())
            )
        }
    }
}

/// Probe each component's availability without running the full workflow.
pub fn workflow_status() -> WorkflowStatus {
    let plans_available = !normalize::normalize_plans(&bamboo::get_bamboo_plans()).is_empty();
    let logs_available =
        !logs::get_all_logs(&[serde_json::json!({"key": "PROJ-PLAN1"})]).is_empty();

    let availability = |ok: bool| {
        if ok {
            "available".to_string()
        } else {
            "unavailable".to_string()
        }
    };

    let ready = plans_available && logs_available;
    WorkflowStatus {
        status: if ready { "healthy" } else { "degraded" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        components: ComponentStatus {
            plan_source: availability(plans_available),
            log_source: availability(logs_available),
            analyzer: "available".to_string(),
            reporting: "available".to_string(),
            orchestrator: "available".to_string(),
        },
        version: WORKFLOW_VERSION.to_string(),
        ready,
    }
}

fn assemble_result(
    question: &str,
    stages: StageData,
    start_time: String,
    end_time: String,
    execution_time: f64,
) -> WorkflowResult {
    let StageData {
        raw_plan_data,
        plans,
        all_logs,
        analyses,
        report,
    } = stages;

    let total_runs: usize = all_logs.iter().map(|l| l.runs.len()).sum();
    let summary = execution_summary(&analyses, &report, execution_time);

    let processing = WorkflowProcessing {
        step1_plans: Some(Step1Plans {
            pipelines_found: plans.len(),
            pipeline_keys: plans.iter().map(|p| p.key.clone()).collect(),
        }),
        step2_logs: Some(Step2Logs {
            logs_retrieved: all_logs.len(),
            total_runs,
            logs_summary: all_logs
                .iter()
                .map(|logs| LogDigest {
                    pipeline_key: logs.pipeline_key.clone(),
                    runs_count: logs.runs.len(),
                    has_errors: logs.runs.iter().any(|run| !run.errors.is_empty()),
                })
                .collect(),
        }),
        step3_analysis: Some(Step3Analysis {
            analyses_completed: analyses.len(),
            analysis_summary: analyses
                .iter()
                .map(|analysis| AnalysisDigest {
                    pipeline_key: analysis.pipeline_key.clone(),
                    error_count: analysis.top_errors.len(),
                    recommendation_count: analysis.recommendations.len(),
                })
                .collect(),
        }),
        step4_reporting: Some(Step4Reporting {
            report_generated: true,
            stats_computed: true,
            bugs_found: report.bugs_summary.len(),
            markdown_length: report.markdown.len(),
        }),
    };

    WorkflowResult {
        workflow_info: WorkflowInfo {
            start_time,
            end_time,
            execution_time_seconds: execution_time,
            status: "success".to_string(),
            version: WORKFLOW_VERSION.to_string(),
            steps_completed: 4,
            error_message: None,
        },
        inputs: WorkflowInputs {
            question: question.to_string(),
            raw_plan_data: Some(raw_plan_data),
            normalized_plans: Some(plans.clone()),
            logs_fetched_count: Some(all_logs.len()),
        },
        processing,
        outputs: WorkflowOutputs {
            pipelines: Some(plans),
            logs: Some(all_logs),
            analyses: Some(analyses),
            report: Some(report),
            summary: Some(summary),
        },
        question: question.to_string(),
    }
}

fn error_result(
    question: &str,
    start_time: String,
    end_time: String,
    execution_time: f64,
    error_message: String,
) -> WorkflowResult {
    WorkflowResult {
        workflow_info: WorkflowInfo {
            start_time,
            end_time,
            execution_time_seconds: execution_time,
            status: "error".to_string(),
            version: WORKFLOW_VERSION.to_string(),
            steps_completed: 0,
            error_message: Some(error_message),
        },
        inputs: WorkflowInputs {
            question: question.to_string(),
            raw_plan_data: None,
            normalized_plans: None,
            logs_fetched_count: None,
        },
        processing: WorkflowProcessing::default(),
        outputs: WorkflowOutputs::default(),
        question: question.to_string(),
    }
}

/// Classify each pipeline and roll up the overall execution health.
fn execution_summary(
    analyses: &[PipelineAnalysis],
    report: &Report,
    execution_time: f64,
) -> ExecutionSummary {
    let stats = &report.stats;

    let mut healthy_pipelines = Vec::new();
    let mut warning_pipelines = Vec::new();
    let mut critical_pipelines = Vec::new();

    for analysis in analyses {
        let summary = analysis.summary.to_lowercase();
        if summary.contains("excellent") || summary.contains("good") || analysis.top_errors.is_empty()
        {
            healthy_pipelines.push(analysis.pipeline_key.clone());
        } else if summary.contains("concerning") || analysis.top_errors.len() <= 2 {
            warning_pipelines.push(analysis.pipeline_key.clone());
        } else {
            critical_pipelines.push(analysis.pipeline_key.clone());
        }
    }

    let (overall_health, health_emoji) =
        if critical_pipelines.is_empty() && warning_pipelines.len() <= 1 {
            ("excellent", "🟢")
        } else if critical_pipelines.is_empty() {
            ("good", "🟡")
        } else if critical_pipelines.len() <= 1 {
            ("concerning", "🟠")
        } else {
            ("critical", "🔴")
        };

    let critical_issues = report
        .bugs_summary
        .iter()
        .filter(|bug| bug.severity == Severity::High)
        .count();

    let success_rate_percent = round1(
        (stats.completed_runs as i64 - stats.errors_total as i64) as f64
            / stats.completed_runs.max(1) as f64
            * 100.0,
    );

    let quick_summary = format!(
        "{health_emoji} {} - {} pipelines, {} errors, {critical_issues} critical issues",
        title_case(overall_health),
        analyses.len(),
        stats.errors_total
    );

    ExecutionSummary {
        overall_health: overall_health.to_string(),
        health_emoji: health_emoji.to_string(),
        execution_time_seconds: execution_time,
        pipelines_analyzed: analyses.len(),
        total_runs_analyzed: stats.runs_total,
        total_errors_found: stats.errors_total,
        critical_issues,
        pipeline_health_breakdown: HealthBreakdown {
            healthy: healthy_pipelines.len(),
            warning: warning_pipelines.len(),
            critical: critical_pipelines.len(),
        },
        pipeline_categories: PipelineCategories {
            healthy_pipelines,
            warning_pipelines,
            critical_pipelines,
        },
        performance_metrics: PerformanceMetrics {
            avg_pipeline_duration_minutes: round1(stats.avg_duration_seconds as f64 / 60.0),
            success_rate_percent,
        },
        quick_summary,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipeLensError, Result as PipeResult};
    use async_trait::async_trait;
    use serde_json::json;

    struct CannedAi;

    #[async_trait]
    impl Completion for CannedAi {
        async fn generate_text(&self, _system: &str, _user: &str) -> PipeResult<String> {
            Ok("# CI/CD Pipeline Report\n\n\
                | Metric | Value |\n\
                |--------|--------|\n\
                | Total Pipelines | 3 |\n\n\
                All Pipeline checks look stable."
                .to_string())
        }

        async fn generate_json(&self, _system: &str, _user: &str, _hint: &str) -> PipeResult<Value> {
            Ok(json!({
                "pipelineKey": "PROJ-PLAN1",
                "summary": "Pipeline shows excellent health with 100% success rate and consistent performance over 3 recent runs",
                "topErrors": [],
                "recommendations": [
                    "Continue monitoring pipeline performance",
                    "Maintain current deployment practices"
                ]
            }))
        }
    }

    struct FailingAi;

    #[async_trait]
    impl Completion for FailingAi {
        async fn generate_text(&self, _system: &str, _user: &str) -> PipeResult<String> {
            Err(PipeLensError::Timeout("simulated failure".to_string()))
        }

        async fn generate_json(&self, _system: &str, _user: &str, _hint: &str) -> PipeResult<Value> {
            Err(PipeLensError::Timeout("simulated failure".to_string()))
        }
    }

    fn canned_orchestrator() -> Orchestrator {
        Orchestrator::new(Some(Arc::new(CannedAi)))
    }

    #[tokio::test]
    async fn test_run_success() {
        let result = canned_orchestrator().run("Test question for pipeline analysis").await;

        assert_eq!(result.workflow_info.status, "success");
        assert_eq!(result.workflow_info.steps_completed, 4);
        assert_eq!(result.question, "Test question for pipeline analysis");
        assert!(result.workflow_info.execution_time_seconds >= 0.0);
        assert!(result.workflow_info.error_message.is_none());
    }

    #[tokio::test]
    async fn test_result_structure() {
        let result = canned_orchestrator().run("Structure test").await;

        assert!(result.inputs.raw_plan_data.is_some());
        assert_eq!(result.inputs.logs_fetched_count, Some(3));
        assert_eq!(result.inputs.normalized_plans.as_ref().unwrap().len(), 3);

        assert!(result.processing.step1_plans.is_some());
        assert!(result.processing.step2_logs.is_some());
        assert!(result.processing.step3_analysis.is_some());
        assert!(result.processing.step4_reporting.is_some());

        assert!(result.outputs.pipelines.is_some());
        assert!(result.outputs.logs.is_some());
        assert!(result.outputs.analyses.is_some());
        assert!(result.outputs.report.is_some());
        assert!(result.outputs.summary.is_some());
    }

    #[tokio::test]
    async fn test_statistics_calculations() {
        let result = canned_orchestrator().run("Stats calculation test").await;
        let stats = &result.outputs.report.as_ref().unwrap().stats;

        assert_eq!(stats.pipelines_total, 3);
        assert_eq!(stats.runs_total, 8);
        assert_eq!(stats.errors_total, 4);
        assert!(stats.avg_duration_seconds > 0);
    }

    #[tokio::test]
    async fn test_markdown_content() {
        let result = canned_orchestrator().run("Markdown content test").await;
        let markdown = &result.outputs.report.as_ref().unwrap().markdown;

        assert!(markdown.starts_with('#'));
        assert!(markdown.contains("Pipeline"));
        assert!(markdown.contains('|'));
        assert!(markdown.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_processing_traceability() {
        let result = canned_orchestrator().run("Traceability test").await;

        let step1 = result.processing.step1_plans.as_ref().unwrap();
        assert_eq!(step1.pipelines_found, 3);
        assert_eq!(
            step1.pipeline_keys,
            ["PROJ-PLAN1", "PROJ-PLAN2", "PROJ-PLAN3"]
        );

        let step2 = result.processing.step2_logs.as_ref().unwrap();
        assert_eq!(step2.logs_retrieved, 3);
        assert_eq!(step2.total_runs, 8);
        assert_eq!(step2.logs_summary.len(), 3);
        assert!(!step2.logs_summary[0].has_errors);
        assert!(step2.logs_summary[1].has_errors);

        let step3 = result.processing.step3_analysis.as_ref().unwrap();
        assert_eq!(step3.analyses_completed, 3);
        assert_eq!(step3.analysis_summary.len(), 3);

        let step4 = result.processing.step4_reporting.as_ref().unwrap();
        assert!(step4.report_generated);
        assert!(step4.stats_computed);
        assert!(step4.markdown_length > 0);
    }

    #[tokio::test]
    async fn test_execution_summary_rollup() {
        let result = canned_orchestrator().run("Summary test").await;
        let summary = result.outputs.summary.as_ref().unwrap();

        // Canned analyses mention "excellent" with no top errors, so every
        // pipeline classifies healthy
        assert_eq!(summary.overall_health, "excellent");
        assert_eq!(summary.health_emoji, "🟢");
        assert_eq!(summary.pipelines_analyzed, 3);
        assert_eq!(summary.total_runs_analyzed, 8);
        assert_eq!(summary.total_errors_found, 4);
        assert_eq!(summary.pipeline_health_breakdown.healthy, 3);
        assert!(summary.performance_metrics.avg_pipeline_duration_minutes > 0.0);
        assert!(summary.performance_metrics.success_rate_percent >= 0.0);
        assert!(summary.performance_metrics.success_rate_percent <= 100.0);
        assert!(summary.quick_summary.contains("3 pipelines"));
    }

    #[tokio::test]
    async fn test_fallback_when_ai_always_fails() {
        let orchestrator = Orchestrator::new(Some(Arc::new(FailingAi)));
        let result = orchestrator.run("Fallback test").await;

        assert_eq!(result.workflow_info.status, "success");

        let analyses = result.outputs.analyses.as_ref().unwrap();
        assert_eq!(analyses.len(), 3);
        for analysis in analyses {
            assert!(!analysis.pipeline_key.is_empty());
            assert!(!analysis.summary.is_empty());
            assert!(!analysis.recommendations.is_empty());
        }

        let markdown = &result.outputs.report.as_ref().unwrap().markdown;
        assert!(markdown.contains("Report generated automatically by Pipeline Assistant"));
    }

    #[tokio::test]
    async fn test_run_without_ai_configured() {
        let orchestrator = Orchestrator::new(None);
        let result = orchestrator.run("No AI test").await;

        assert_eq!(result.workflow_info.status, "success");
        assert_eq!(result.outputs.analyses.as_ref().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_deterministic_results() {
        let orchestrator = canned_orchestrator();
        let first = orchestrator.run("Deterministic test").await;
        let second = orchestrator.run("Deterministic test").await;

        let first_report = first.outputs.report.as_ref().unwrap();
        let second_report = second.outputs.report.as_ref().unwrap();
        assert_eq!(first_report.stats, second_report.stats);

        let first_keys = &first.processing.step1_plans.as_ref().unwrap().pipeline_keys;
        let second_keys = &second.processing.step1_plans.as_ref().unwrap().pipeline_keys;
        assert_eq!(first_keys, second_keys);

        assert_eq!(
            first.processing.step2_logs.as_ref().unwrap().total_runs,
            second.processing.step2_logs.as_ref().unwrap().total_runs
        );
    }

    #[test]
    fn test_error_result_envelope() {
        let result = error_result(
            "Error test",
            "2025-09-17T00:00:00Z".to_string(),
            "2025-09-17T00:00:01Z".to_string(),
            1.0,
            "stage blew up".to_string(),
        );

        assert_eq!(result.workflow_info.status, "error");
        assert_eq!(result.workflow_info.steps_completed, 0);
        assert_eq!(
            result.workflow_info.error_message.as_deref(),
            Some("stage blew up")
        );

        // Empty sections serialize as empty objects, per the envelope contract
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["processing"], json!({}));
        assert_eq!(value["outputs"], json!({}));
        assert_eq!(value["inputs"], json!({"question": "Error test"}));
    }

    #[test]
    fn test_workflow_status_probe() {
        let status = workflow_status();
        assert_eq!(status.status, "healthy");
        assert!(status.ready);
        assert_eq!(status.components.plan_source, "available");
        assert_eq!(status.components.log_source, "available");
        assert_eq!(status.version, WORKFLOW_VERSION);
    }

    #[tokio::test]
    async fn test_quick_health_check() {
        let orchestrator = Orchestrator::new(None);
        let message = orchestrator.quick_health_check().await;
        assert!(message.starts_with("✅"));
        assert!(message.contains("3 pipelines"));
    }

    #[test]
    fn test_workflow_result_serializes_with_contract_keys() {
        let result = error_result(
            "Contract test",
            "2025-09-17T00:00:00Z".to_string(),
            "2025-09-17T00:00:01Z".to_string(),
            1.0,
            "boom".to_string(),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("workflowInfo").is_some());
        assert!(value["workflowInfo"].get("startTime").is_some());
        assert!(value["workflowInfo"].get("executionTimeSeconds").is_some());
        assert!(value["workflowInfo"].get("stepsCompleted").is_some());
        assert!(value.get("question").is_some());
    }
}
