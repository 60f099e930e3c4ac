//! Fleet aggregation and report generation.
//!
//! Computes fleet statistics and a ranked bug summary from the logs, then
//! renders a narrative Markdown report via the AI capability with a fixed
//! deterministic template as fallback.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::Utc;
use indexmap::IndexSet;
use log::warn;

use crate::ai::{AiOutcome, Completion};
use crate::model::{BugEntry, FleetStatistics, PipelineAnalysis, PipelineLog, Report, RunRecord, Severity};

const REPORT_SYSTEM_PROMPT: &str = "\
You are an experienced DevOps manager creating executive reports for engineering leadership.
Your reports are clear, actionable, and focus on business impact. You highlight both successes
and areas needing attention.

Create professional Markdown reports that executives and engineering managers can quickly
understand and act upon.";

const HIGH_SEVERITY_KEYWORDS: [&str; 8] = [
    "timeout",
    "connection",
    "database",
    "service unavailable",
    "out of memory",
    "disk space",
    "network",
    "authentication failed",
];

const MEDIUM_SEVERITY_KEYWORDS: [&str; 6] = [
    "test failed",
    "assertion",
    "compilation error",
    "build failed",
    "dependency",
    "configuration",
];

const MAX_REPORTED_BUGS: usize = 5;
const MAX_REPORTED_RECOMMENDATIONS: usize = 5;

/// Aggregate statistics and render the fleet report.
///
/// Both inputs are re-sorted by pipeline key so the output is deterministic
/// regardless of input order. The Markdown narrative comes from the AI
/// capability when available, else from the deterministic template.
pub async fn aggregate_and_report(
    ai: Option<&dyn Completion>,
    analyses: &[PipelineAnalysis],
    all_logs: &[PipelineLog],
) -> Report {
    let mut analyses = analyses.to_vec();
    analyses.sort_by(|a, b| a.pipeline_key.cmp(&b.pipeline_key));
    let mut all_logs = all_logs.to_vec();
    all_logs.sort_by(|a, b| a.pipeline_key.cmp(&b.pipeline_key));

    let stats = compute_statistics(&analyses, &all_logs);
    let bugs_summary = extract_bugs_summary(&analyses, &all_logs);

    let outcome = match ai {
        Some(ai) => ai_report(ai, &stats, &bugs_summary, &analyses).await,
        None => AiOutcome::Fallback {
            reason: "AI capability not configured".to_string(),
        },
    };

    let markdown = match outcome {
        AiOutcome::Completed(markdown) => markdown,
        AiOutcome::Fallback { reason } => {
            warn!("AI report generation failed ({reason}), using fallback template");
            fallback_report(&stats, &bugs_summary, &analyses)
        }
    };

    Report {
        stats,
        bugs_summary,
        markdown,
    }
}

/// Count runs and errors from the logs (the authoritative source, not the
/// analyses). Only runs with a positive duration contribute to the average.
pub fn compute_statistics(
    analyses: &[PipelineAnalysis],
    all_logs: &[PipelineLog],
) -> FleetStatistics {
    let pipelines_total = analyses.len();
    let mut runs_total = 0;
    let mut errors_total = 0;
    let mut total_duration = 0u64;
    let mut completed_runs = 0usize;

    for logs in all_logs {
        runs_total += logs.runs.len();
        for run in &logs.runs {
            errors_total += run.errors.len();
            if run.duration_seconds > 0 {
                total_duration += run.duration_seconds;
                completed_runs += 1;
            }
        }
    }

    let avg_duration_seconds = if completed_runs > 0 {
        (total_duration as f64 / completed_runs as f64).round() as u64
    } else {
        0
    };

    FleetStatistics {
        pipelines_total,
        runs_total,
        avg_duration_seconds,
        errors_total,
        completed_runs,
    }
}

/// Classify an error's severity from its message content and frequency.
pub fn determine_error_severity(error_message: &str, frequency: u64) -> Severity {
    let error_lower = error_message.to_lowercase();

    if frequency >= 3 || HIGH_SEVERITY_KEYWORDS.iter().any(|k| error_lower.contains(k)) {
        Severity::High
    } else if frequency >= 2 || MEDIUM_SEVERITY_KEYWORDS.iter().any(|k| error_lower.contains(k)) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Find the most recent run carrying the given error message, with the step
/// it failed in. Runs are assumed newest-first.
fn find_recent_error_run<'a>(
    logs: &'a PipelineLog,
    error_message: &str,
) -> Option<(&'a RunRecord, &'a str)> {
    for run in &logs.runs {
        for error in &run.errors {
            if error.message == error_message {
                return Some((run, error.step.as_str()));
            }
        }
    }
    None
}

/// Extract ranked bug entries from the analyses, attaching run context from
/// the logs. Sorted by severity rank, then frequency, both descending.
pub fn extract_bugs_summary(
    analyses: &[PipelineAnalysis],
    all_logs: &[PipelineLog],
) -> Vec<BugEntry> {
    let logs_by_key: HashMap<&str, &PipelineLog> = all_logs
        .iter()
        .map(|logs| (logs.pipeline_key.as_str(), logs))
        .collect();

    let mut bugs_summary = Vec::new();

    for analysis in analyses {
        let pipeline_logs = logs_by_key.get(analysis.pipeline_key.as_str()).copied();

        for error in &analysis.top_errors {
            let severity = determine_error_severity(&error.message, error.count);
            let context = pipeline_logs.and_then(|logs| find_recent_error_run(logs, &error.message));

            bugs_summary.push(BugEntry {
                pipeline_key: analysis.pipeline_key.clone(),
                pipeline_name: pipeline_logs
                    .map(|logs| logs.pipeline_name.clone())
                    .unwrap_or_else(|| "Unknown Pipeline".to_string()),
                error_message: error.message.clone(),
                frequency: error.count,
                severity,
                last_seen: context
                    .map(|(run, _)| run.started_at.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                affected_step: context
                    .map(|(_, step)| step.to_string())
                    .unwrap_or_else(|| "Unknown".to_string()),
            });
        }
    }

    bugs_summary.sort_by_key(|bug| (Reverse(bug.severity.rank()), Reverse(bug.frequency)));
    bugs_summary
}

fn overall_success_rate(stats: &FleetStatistics) -> f64 {
    (stats.completed_runs as i64 - stats.errors_total as i64) as f64
        / stats.completed_runs.max(1) as f64
        * 100.0
}

async fn ai_report(
    ai: &dyn Completion,
    stats: &FleetStatistics,
    bugs_summary: &[BugEntry],
    analyses: &[PipelineAnalysis],
) -> AiOutcome<String> {
    let mut data_summary = format!(
        "PIPELINE STATISTICS:\n\
         - Total Pipelines: {}\n\
         - Total Runs Analyzed: {}\n\
         - Average Run Duration: {} seconds ({} minutes)\n\
         - Total Errors Found: {}\n\
         - Completed Runs: {}\n\n\
         CRITICAL ISSUES ({} total):\n",
        stats.pipelines_total,
        stats.runs_total,
        stats.avg_duration_seconds,
        stats.avg_duration_seconds / 60,
        stats.errors_total,
        stats.completed_runs,
        bugs_summary.len()
    );

    for bug in bugs_summary.iter().take(MAX_REPORTED_BUGS) {
        let _ = writeln!(
            data_summary,
            "- {}: {} (Pipeline: {}, Frequency: {})",
            bug.severity.label().to_uppercase(),
            bug.error_message,
            bug.pipeline_key,
            bug.frequency
        );
    }

    data_summary.push_str("\nPIPELINE ANALYSIS SUMMARIES:\n");
    for analysis in analyses {
        let _ = write!(
            data_summary,
            "\n{}:\n  Summary: {}\n",
            analysis.pipeline_key, analysis.summary
        );
        if !analysis.recommendations.is_empty() {
            let key_recommendations: Vec<&str> = analysis
                .recommendations
                .iter()
                .take(2)
                .map(String::as_str)
                .collect();
            let _ = writeln!(
                data_summary,
                "  Key Recommendations: {}",
                key_recommendations.join("; ")
            );
        }
    }

    let user_prompt = format!(
        "Create a comprehensive CI/CD Pipeline Report based on this data:\n\n\
         {data_summary}\n\n\
         Structure the report with these sections:\n\
         1. **Executive Summary** - High-level health and key findings\n\
         2. **Pipeline Performance Overview** - Statistics and trends\n\
         3. **Critical Issues** - Top bugs and failures requiring attention\n\
         4. **Recommendations** - Actionable next steps prioritized by impact\n\
         5. **Individual Pipeline Status** - Brief status for each pipeline\n\n\
         Use professional tone suitable for engineering leadership. Include specific metrics \
         and make recommendations actionable with clear priorities."
    );

    match ai.generate_report(REPORT_SYSTEM_PROMPT, &user_prompt).await {
        Ok(mut markdown) => {
            // Trailing newline is a post-condition applied exactly once
            if !markdown.ends_with('\n') {
                markdown.push('\n');
            }
            AiOutcome::Completed(markdown)
        }
        Err(e) => AiOutcome::Fallback {
            reason: e.to_string(),
        },
    }
}

/// Deterministic Markdown report used when the AI path is unavailable.
pub fn fallback_report(
    stats: &FleetStatistics,
    bugs_summary: &[BugEntry],
    analyses: &[PipelineAnalysis],
) -> String {
    let avg_minutes = stats.avg_duration_seconds / 60;

    let mut report = format!(
        "# CI/CD Pipeline Report\n\
         *Generated on {}*\n\n\
         ## Executive Summary\n\n\
         Analysis of **{} pipelines** with **{} total runs** shows:\n\
         - Average execution time: **{} minutes**\n\
         - Total errors detected: **{}**\n\
         - Success rate: **{:.1}%**\n\n\
         ## Pipeline Performance Overview\n\n\
         | Metric | Value |\n\
         |--------|--------|\n\
         | Total Pipelines | {} |\n\
         | Total Runs | {} |\n\
         | Average Duration | {}s ({}m) |\n\
         | Total Errors | {} |\n\
         | Completed Runs | {} |\n\n\
         ## Critical Issues\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        stats.pipelines_total,
        stats.runs_total,
        avg_minutes,
        stats.errors_total,
        overall_success_rate(stats),
        stats.pipelines_total,
        stats.runs_total,
        stats.avg_duration_seconds,
        avg_minutes,
        stats.errors_total,
        stats.completed_runs
    );

    if bugs_summary.is_empty() {
        report.push_str("No critical issues detected. ✅\n\n");
    } else {
        let _ = writeln!(
            report,
            "Found **{} critical issues** requiring attention:\n",
            bugs_summary.len()
        );
        for (i, bug) in bugs_summary.iter().take(MAX_REPORTED_BUGS).enumerate() {
            let severity_icon = match bug.severity {
                Severity::High => "🔴",
                Severity::Medium => "🟡",
                Severity::Low => "🟢",
            };
            let _ = write!(
                report,
                "{}. {} **{}**: {}\n   - Frequency: {} occurrences\n   - Severity: {}\n\n",
                i + 1,
                severity_icon,
                bug.pipeline_key,
                bug.error_message,
                bug.frequency,
                bug.severity.title()
            );
        }
    }

    report.push_str("## Recommendations\n\n");

    // First-seen order, duplicates dropped
    let mut unique_recommendations: IndexSet<&str> = IndexSet::new();
    for analysis in analyses {
        for recommendation in &analysis.recommendations {
            unique_recommendations.insert(recommendation.as_str());
        }
    }

    if unique_recommendations.is_empty() {
        report.push_str("Continue monitoring pipeline performance and maintain current practices.\n");
    } else {
        for (i, recommendation) in unique_recommendations
            .iter()
            .take(MAX_REPORTED_RECOMMENDATIONS)
            .enumerate()
        {
            let _ = writeln!(report, "{}. {}", i + 1, recommendation);
        }
    }

    report.push_str("\n## Individual Pipeline Status\n\n");

    for analysis in analyses {
        let summary_lower = analysis.summary.to_lowercase();
        let status_icon = if summary_lower.contains("excellent") || summary_lower.contains("good") {
            "✅"
        } else if summary_lower.contains("concerning") || summary_lower.contains("poor") {
            "⚠️"
        } else {
            "ℹ️"
        };
        let _ = write!(
            report,
            "### {} {}\n{}\n\n",
            status_icon, analysis.pipeline_key, analysis.summary
        );
    }

    report.push_str("---\n*Report generated automatically by Pipeline Assistant*\n");
    report
}

/// One-line fleet status suitable for a standup or chat channel.
pub fn daily_summary(analyses: &[PipelineAnalysis], all_logs: &[PipelineLog]) -> String {
    let stats = compute_statistics(analyses, all_logs);
    let bugs_summary = extract_bugs_summary(analyses, all_logs);

    let success_rate = overall_success_rate(&stats);
    let high_severity_issues = bugs_summary
        .iter()
        .filter(|bug| bug.severity == Severity::High)
        .count();

    let status = if success_rate >= 90.0 && high_severity_issues == 0 {
        "🟢 All systems healthy"
    } else if success_rate >= 75.0 && high_severity_issues <= 1 {
        "🟡 Minor issues detected"
    } else {
        "🔴 Issues require attention"
    };

    format!(
        "{status} | {} pipelines, {} runs, {:.0}% success rate, {high_severity_issues} critical issues",
        stats.pipelines_total, stats.runs_total, success_rate
    )
}
