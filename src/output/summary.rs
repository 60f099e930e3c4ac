use std::fmt::Write;

use crate::orchestrator::WorkflowResult;

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{color_coded_success_cell, create_table};

/// Prints a human-readable execution summary to stdout.
///
/// Displays the overall health rollup, a fleet statistics table with a
/// color-coded success rate, and the list of actively failing pipelines.
/// Used by the CLI in verbose mode alongside the serialized result.
pub fn print_execution_summary(result: &WorkflowResult) {
    println!("{}", render_execution_summary(result));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn render_execution_summary(result: &WorkflowResult) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📋", "Execution Summary");

    let info = &result.workflow_info;
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}s",
        dim("Question:"),
        cyan(&result.question),
        dim("Status:"),
        if info.status == "success" {
            bright_green(&info.status)
        } else {
            bright_red(&info.status)
        },
        dim("Execution time:"),
        bright_yellow(info.execution_time_seconds)
    );

    if let Some(summary) = &result.outputs.summary {
        let _ = writeln!(
            output,
            "  {} {} {}",
            dim("Overall health:"),
            summary.health_emoji,
            bright(&summary.overall_health)
        );
    }
    output.push('\n');

    if let Some(report) = &result.outputs.report {
        let stats = &report.stats;
        let mut table = create_table();
        table.set_header(vec!["Metric", "Value"]);
        table.add_row(vec![
            "Total Pipelines".to_string(),
            stats.pipelines_total.to_string(),
        ]);
        table.add_row(vec!["Total Runs".to_string(), stats.runs_total.to_string()]);
        table.add_row(vec![
            "Average Duration".to_string(),
            format!(
                "{}s ({}m)",
                stats.avg_duration_seconds,
                stats.avg_duration_seconds / 60
            ),
        ]);
        table.add_row(vec![
            "Total Errors".to_string(),
            stats.errors_total.to_string(),
        ]);
        table.add_row(vec![
            "Completed Runs".to_string(),
            stats.completed_runs.to_string(),
        ]);
        if let Some(summary) = &result.outputs.summary {
            table.add_row(vec![
                comfy_table::Cell::new("Success Rate"),
                color_coded_success_cell(summary.performance_metrics.success_rate_percent),
            ]);
        }
        let _ = writeln!(output, "{table}\n");
    }

    if let Some(analyses) = &result.outputs.analyses {
        let failing: Vec<&str> = analyses
            .iter()
            .filter(|a| !a.top_errors.is_empty())
            .map(|a| a.pipeline_key.as_str())
            .collect();

        if failing.is_empty() {
            let _ = writeln!(
                output,
                "{}",
                bright_green("✅ No actively failing pipelines detected")
            );
        } else {
            let _ = writeln!(
                output,
                "{} {}",
                bright_red("🔴 Failing pipelines:"),
                failing.join(", ")
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Orchestrator;

    #[tokio::test]
    async fn test_render_execution_summary_mentions_fleet() {
        let result = Orchestrator::new(None).run("summary render test").await;
        let rendered = render_execution_summary(&result);
        assert!(rendered.contains("Execution Summary"));
        assert!(rendered.contains("Total Pipelines"));
        assert!(rendered.contains("Failing pipelines:"));
        assert!(rendered.contains("PROJ-PLAN2"));
    }
}
