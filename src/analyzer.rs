//! Per-pipeline log analysis.
//!
//! The primary path asks the AI capability for a structured analysis; any
//! failure (unavailable backend, invalid JSON, missing schema keys) degrades
//! to a deterministic heuristic analysis with the same output shape.

use indexmap::IndexMap;
use log::warn;
use serde_json::Value;

use crate::ai::{AiOutcome, Completion};
use crate::error::{PipeLensError, Result};
use crate::model::{CommonIssue, FleetSummary, PipelineAnalysis, PipelineLog, RunStatus, TopError};

const ANALYST_SYSTEM_PROMPT: &str = "\
You are a senior CI/CD engineer with 10+ years of experience analyzing Bamboo pipeline logs.
Your expertise includes identifying failure patterns, performance bottlenecks, and providing
actionable recommendations for improving pipeline reliability and efficiency.

Analyze the provided pipeline log data and provide insights that would help a development
team optimize their CI/CD process.";

const RESPONSE_SCHEMA_HINT: &str = r#"{
  "pipelineKey": "string - the pipeline identifier",
  "summary": "string - concise 2-3 sentence overview of pipeline health and key findings",
  "topErrors": [
    {
      "message": "string - clear description of the error or issue",
      "count": "integer - number of times this error occurred"
    }
  ],
  "recommendations": [
    "string - specific actionable recommendation for improvement"
  ]
}"#;

const REQUIRED_KEYS: [&str; 4] = ["pipelineKey", "summary", "topErrors", "recommendations"];

const MAX_TOP_ERRORS: usize = 5;
const MAX_RECOMMENDATIONS: usize = 5;
const SLOW_BUILD_THRESHOLD_SECONDS: f64 = 1800.0;

/// Analyze one pipeline's logs, preferring the AI path.
///
/// Never fails: every AI-path problem falls back to the heuristic analysis,
/// and the fallback reason is logged.
pub async fn analyze_pipeline_logs(
    ai: Option<&dyn Completion>,
    logs: &PipelineLog,
) -> PipelineAnalysis {
    let outcome = match ai {
        Some(ai) => ai_analysis(ai, logs).await,
        None => AiOutcome::Fallback {
            reason: "AI capability not configured".to_string(),
        },
    };

    match outcome {
        AiOutcome::Completed(analysis) => analysis,
        AiOutcome::Fallback { reason } => {
            warn!(
                "AI analysis failed for {} ({reason}), falling back to heuristic analysis",
                logs.pipeline_key
            );
            heuristic_analysis(logs)
        }
    }
}

/// Analyze a batch of pipeline logs, one analysis per input log in input
/// order. A failing pipeline never aborts the batch.
pub async fn analyze_all(
    ai: Option<&dyn Completion>,
    all_logs: &[PipelineLog],
) -> Vec<PipelineAnalysis> {
    let mut analyses = Vec::with_capacity(all_logs.len());
    for logs in all_logs {
        analyses.push(analyze_pipeline_logs(ai, logs).await);
    }
    analyses
}

async fn ai_analysis(ai: &dyn Completion, logs: &PipelineLog) -> AiOutcome<PipelineAnalysis> {
    let payload = match serde_json::to_string_pretty(logs) {
        Ok(payload) => payload,
        Err(e) => {
            return AiOutcome::Fallback {
                reason: format!("failed to serialize logs: {e}"),
            }
        }
    };

    let user_prompt = format!(
        "Analyze the following Bamboo pipeline logs for {} ({}):\n\n\
         {payload}\n\n\
         Please provide a comprehensive analysis focusing on:\n\
         1. Overall pipeline health and performance trends\n\
         2. Error patterns and their frequency\n\
         3. Specific actionable recommendations for improvement\n\
         4. Any performance or reliability concerns\n\n\
         Consider the success/failure rates, error types, duration patterns, and any recurring issues.",
        logs.pipeline_name, logs.pipeline_key
    );

    let value = match ai
        .generate_json(ANALYST_SYSTEM_PROMPT, &user_prompt, RESPONSE_SCHEMA_HINT)
        .await
    {
        Ok(value) => value,
        Err(e) => {
            return AiOutcome::Fallback {
                reason: e.to_string(),
            }
        }
    };

    match parse_ai_analysis(&value, &logs.pipeline_key) {
        Ok(analysis) => AiOutcome::Completed(analysis),
        Err(e) => AiOutcome::Fallback {
            reason: e.to_string(),
        },
    }
}

/// Validate and coerce an AI response into a `PipelineAnalysis`.
///
/// All four schema keys must be present. List-typed fields with the wrong
/// type coerce to empty lists; bare-string error entries normalize to
/// `{message, count: 1}`. The pipeline key is forced to the input log's key
/// regardless of what the response claims.
fn parse_ai_analysis(value: &Value, pipeline_key: &str) -> Result<PipelineAnalysis> {
    let obj = value
        .as_object()
        .ok_or_else(|| PipeLensError::Validation("AI response is not a JSON object".to_string()))?;

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .filter(|key| !obj.contains_key(**key))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(PipeLensError::Validation(format!(
            "AI response missing required keys: {}",
            missing.join(", ")
        )));
    }

    let summary = match &obj["summary"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let top_errors = obj["topErrors"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| match entry {
                    Value::String(message) => Some(TopError {
                        message: message.clone(),
                        count: 1,
                    }),
                    Value::Object(error) => Some(TopError {
                        message: error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("Unknown error")
                            .to_string(),
                        count: error.get("count").and_then(Value::as_u64).unwrap_or(1),
                    }),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let recommendations = obj["recommendations"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| match entry {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(PipelineAnalysis {
        pipeline_key: pipeline_key.to_string(),
        summary,
        top_errors,
        recommendations,
    })
}

/// Deterministic analysis used when the AI path is unavailable.
pub fn heuristic_analysis(logs: &PipelineLog) -> PipelineAnalysis {
    if logs.runs.is_empty() {
        return PipelineAnalysis {
            pipeline_key: logs.pipeline_key.clone(),
            summary: format!("No execution data available for {}", logs.pipeline_name),
            top_errors: vec![],
            recommendations: vec!["Configure pipeline to capture execution logs".to_string()],
        };
    }

    let total_runs = logs.runs.len();
    let successful_runs = logs
        .runs
        .iter()
        .filter(|r| r.status == RunStatus::Success)
        .count();
    let failed_runs = logs
        .runs
        .iter()
        .filter(|r| r.status == RunStatus::Failed)
        .count();
    let in_progress_runs = logs
        .runs
        .iter()
        .filter(|r| r.status == RunStatus::InProgress)
        .count();

    let success_rate = successful_runs as f64 / total_runs as f64 * 100.0;

    let mut all_errors = Vec::new();
    let mut total_duration = 0u64;
    let mut completed_runs = 0usize;

    for run in &logs.runs {
        for error in &run.errors {
            all_errors.push(error.message.as_str());
        }
        // A duration of 0 means the run has not completed
        if run.duration_seconds > 0 {
            total_duration += run.duration_seconds;
            completed_runs += 1;
        }
    }

    let top_errors = count_top_errors(&all_errors);

    let avg_duration = if completed_runs > 0 {
        total_duration as f64 / completed_runs as f64
    } else {
        0.0
    };
    let avg_minutes = (avg_duration / 60.0).floor() as u64;

    let health_status = if success_rate >= 90.0 {
        "excellent"
    } else if success_rate >= 75.0 {
        "good"
    } else if success_rate >= 50.0 {
        "concerning"
    } else {
        "poor"
    };

    let mut summary_parts = vec![format!(
        "Pipeline shows {health_status} health with {success_rate:.1}% success rate \
         ({successful_runs}/{total_runs} runs)"
    )];
    if avg_duration > 0.0 {
        summary_parts.push(format!("Average execution time is {avg_minutes} minutes"));
    }
    if failed_runs > 0 {
        summary_parts.push(format!("{failed_runs} recent failures requiring attention"));
    }
    let summary = format!("{}.", summary_parts.join(". "));

    let mut recommendations = Vec::new();

    if success_rate < 75.0 {
        recommendations
            .push("Investigate recurring failures to improve pipeline stability".to_string());
    }
    if !top_errors.is_empty() {
        recommendations.push("Address top error patterns to reduce failure rate".to_string());
    }
    if avg_duration > SLOW_BUILD_THRESHOLD_SECONDS {
        recommendations
            .push("Consider optimizing build steps to reduce execution time".to_string());
    }
    if failed_runs > successful_runs {
        recommendations
            .push("Pipeline requires immediate attention due to high failure rate".to_string());
    }
    if in_progress_runs > 0 {
        recommendations.push("Monitor currently running builds for potential issues".to_string());
    }

    let error_text = all_errors.join(" ").to_lowercase();
    if error_text.contains("timeout") {
        recommendations.push("Review timeout configurations and resource allocation".to_string());
    }
    if error_text.contains("test") && error_text.contains("failed") {
        recommendations
            .push("Focus on test stability and test environment configuration".to_string());
    }
    if error_text.contains("connection") || error_text.contains("network") {
        recommendations
            .push("Investigate network connectivity and service dependencies".to_string());
    }

    if recommendations.is_empty() {
        if success_rate >= 90.0 {
            recommendations.push("Pipeline performing well, continue monitoring".to_string());
        } else {
            recommendations.push(
                "Monitor pipeline trends and investigate any performance degradation".to_string(),
            );
        }
    }
    recommendations.truncate(MAX_RECOMMENDATIONS);

    PipelineAnalysis {
        pipeline_key: logs.pipeline_key.clone(),
        summary,
        top_errors,
        recommendations,
    }
}

/// Count error messages, most frequent first. Ties keep first-seen order,
/// which the insertion-ordered map plus a stable sort guarantees.
fn count_top_errors(all_errors: &[&str]) -> Vec<TopError> {
    let mut counter: IndexMap<&str, u64> = IndexMap::new();
    for message in all_errors {
        *counter.entry(message).or_insert(0) += 1;
    }

    let mut counted: Vec<(&str, u64)> = counter.into_iter().collect();
    counted.sort_by(|a, b| b.1.cmp(&a.1));
    counted
        .into_iter()
        .take(MAX_TOP_ERRORS)
        .map(|(message, count)| TopError {
            message: message.to_string(),
            count,
        })
        .collect()
}

const HEALTHY_KEYWORDS: [&str; 4] = ["excellent", "good", "performing well", "consistent success"];
const UNHEALTHY_KEYWORDS: [&str; 4] = ["poor", "concerning", "failures", "requires attention"];

/// High-level rollup across multiple pipeline analyses.
///
/// Issues and recommendations are only promoted when they affect more than
/// one pipeline.
pub fn fleet_summary(analyses: &[PipelineAnalysis]) -> FleetSummary {
    if analyses.is_empty() {
        return FleetSummary {
            total_pipelines: 0,
            overall_health: "unknown".to_string(),
            common_issues: vec![],
            fleet_recommendations: vec![],
        };
    }

    let mut issue_counter: IndexMap<&str, usize> = IndexMap::new();
    let mut recommendation_counter: IndexMap<&str, usize> = IndexMap::new();
    for analysis in analyses {
        for error in &analysis.top_errors {
            *issue_counter.entry(error.message.as_str()).or_insert(0) += 1;
        }
        for recommendation in &analysis.recommendations {
            *recommendation_counter
                .entry(recommendation.as_str())
                .or_insert(0) += 1;
        }
    }

    let mut issues: Vec<(&str, usize)> = issue_counter.into_iter().collect();
    issues.sort_by(|a, b| b.1.cmp(&a.1));
    let common_issues = issues
        .into_iter()
        .take(3)
        .filter(|(_, count)| *count > 1)
        .map(|(issue, count)| CommonIssue {
            issue: issue.to_string(),
            affected_pipelines: count,
        })
        .collect();

    let mut recommendations: Vec<(&str, usize)> = recommendation_counter.into_iter().collect();
    recommendations.sort_by(|a, b| b.1.cmp(&a.1));
    let fleet_recommendations = recommendations
        .into_iter()
        .take(5)
        .filter(|(_, count)| *count > 1)
        .map(|(recommendation, _)| recommendation.to_string())
        .take(3)
        .collect();

    let mut health_score = 0i64;
    for analysis in analyses {
        let summary = analysis.summary.to_lowercase();
        if HEALTHY_KEYWORDS.iter().any(|k| summary.contains(k)) {
            health_score += 1;
        } else if UNHEALTHY_KEYWORDS.iter().any(|k| summary.contains(k)) {
            health_score -= 1;
        }
    }

    let total = analyses.len();
    let overall_health = if health_score as f64 > total as f64 * 0.5 {
        "good"
    } else if (health_score as f64) < -(total as f64) * 0.3 {
        "concerning"
    } else {
        "mixed"
    };

    FleetSummary {
        total_pipelines: total,
        overall_health: overall_health.to_string(),
        common_issues,
        fleet_recommendations,
    }
}
