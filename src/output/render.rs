use clap::ValueEnum;

use crate::error::{PipeLensError, Result};
use crate::orchestrator::WorkflowResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Markdown,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Markdown => "markdown",
        })
    }
}

/// Serializes a workflow result for stdout.
///
/// JSON and YAML render the full envelope; Markdown renders the narrative
/// report alone, which only exists on successful runs.
pub fn render_result(result: &WorkflowResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(result)?),
        OutputFormat::Markdown => result
            .outputs
            .report
            .as_ref()
            .map(|report| report.markdown.clone())
            .ok_or_else(|| {
                PipeLensError::Workflow("no report available in workflow result".to_string())
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Orchestrator;

    #[tokio::test]
    async fn test_render_json_uses_contract_keys() {
        let result = Orchestrator::new(None).run("render test").await;
        let json = render_result(&result, OutputFormat::Json).unwrap();
        assert!(json.contains("\"workflowInfo\""));
        assert!(json.contains("\"stepsCompleted\""));
        assert!(json.contains("\"bugsSummary\""));
    }

    #[tokio::test]
    async fn test_render_yaml() {
        let result = Orchestrator::new(None).run("render test").await;
        let yaml = render_result(&result, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("workflowInfo:"));
        assert!(yaml.contains("question: render test"));
    }

    #[tokio::test]
    async fn test_render_markdown_is_the_report() {
        let result = Orchestrator::new(None).run("render test").await;
        let markdown = render_result(&result, OutputFormat::Markdown).unwrap();
        assert!(markdown.starts_with('#'));
        assert_eq!(
            markdown,
            result.outputs.report.as_ref().unwrap().markdown
        );
    }
}
