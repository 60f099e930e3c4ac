use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ai::AzureAiClient;
use crate::config::{AiSettings, Config};
use crate::error::PipeLensError;
use crate::orchestrator::Orchestrator;
use crate::output::{self, OutputFormat};

#[derive(Parser)]
#[command(name = "pipelens")]
#[command(author, version, about = "AI-assisted CI/CD pipeline health analysis", long_about = None)]
pub struct Cli {
    /// The question to analyze about CI/CD pipelines
    #[arg(short, long)]
    question: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    output: OutputFormat,

    /// Suppress progress messages
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// Show detailed processing steps
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// Path to a pipelens configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        // Fail fast on incomplete AI settings, before any analysis work
        let settings = AiSettings::resolve(&config).map_err(|e| {
            eprintln!("{} {e}", output::bright_red("❌"));
            e
        })?;
        let client = AzureAiClient::new(&settings)?;
        let orchestrator = Orchestrator::new(Some(Arc::new(client)));

        if !self.quiet {
            eprintln!("🚀 Starting pipeline analysis...");
            if self.verbose {
                eprintln!("Question: {}", self.question);
                eprintln!("Output format: {}", self.output);
            }
        }

        info!("Running analysis workflow for question: '{}'", self.question);
        let result = orchestrator.run(&self.question).await;

        if self.verbose {
            if let Some(report) = result.outputs.report.as_ref() {
                eprintln!(
                    "✅ Analysis completed in {:.2} seconds",
                    result.workflow_info.execution_time_seconds
                );
                eprintln!("📊 Analyzed {} pipelines", report.stats.pipelines_total);
                eprintln!("🔍 Found {} total errors", report.stats.errors_total);
            }
        }

        let rendered = output::render_result(&result, self.output)?;
        println!("{rendered}");

        if self.verbose && self.output == OutputFormat::Markdown {
            output::print_execution_summary(&result);
        }

        // A workflow-level failure still prints the envelope above, but the
        // process must exit non-zero
        if result.workflow_info.status == "error" {
            let message = result
                .workflow_info
                .error_message
                .unwrap_or_else(|| "Unknown workflow error".to_string());
            return Err(PipeLensError::Workflow(message).into());
        }

        Ok(())
    }
}
