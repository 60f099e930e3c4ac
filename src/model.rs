use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized CI/CD pipeline definition.
///
/// Produced by the normalizer from a raw Bamboo-style plan record. Every field
/// is defaulted when the source record is missing it, so a descriptor always
/// exists for every plan in the listing. The untouched source record is kept
/// in `original` for auditing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDescriptor {
    /// Globally unique plan key (e.g. "PROJ-PLAN1")
    pub key: String,
    pub name: String,
    pub enabled: bool,
    pub short_name: String,
    pub project_key: String,
    pub project_name: String,
    pub description: String,
    pub is_active: bool,
    pub is_building: bool,
    pub average_build_time_seconds: u64,
    /// Self link from the listing payload
    pub link: String,
    /// Raw source record, preserved verbatim
    pub original: Value,
}

/// Terminal or in-flight state of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failed,
    InProgress,
}

/// An error recorded against one step of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub step: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: String,
    pub status: RunStatus,
    pub duration_seconds: u64,
    pub output: String,
}

/// One execution attempt of a pipeline.
///
/// A `duration_seconds` of 0 means the run has not completed; such runs are
/// excluded from duration averages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: String,
    pub build_number: u64,
    pub status: RunStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub duration_seconds: u64,
    pub triggered_by: String,
    pub branch: String,
    pub commit_hash: String,
    pub errors: Vec<RunError>,
    pub steps: Vec<StepRecord>,
}

/// Execution log for one pipeline. Unknown keys yield an empty log rather
/// than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineLog {
    pub pipeline_key: String,
    pub pipeline_name: String,
    pub total_runs: usize,
    pub runs: Vec<RunRecord>,
    /// Diagnostic marker set when no pipeline key could be resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopError {
    pub message: String,
    pub count: u64,
}

/// Structured analysis of one pipeline's logs, from the AI path or the
/// heuristic fallback. `top_errors` and `recommendations` are always present,
/// even when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineAnalysis {
    pub pipeline_key: String,
    pub summary: String,
    pub top_errors: Vec<TopError>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Rank used for sorting: higher is more severe.
    pub fn rank(self) -> u8 {
        match self {
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// A ranked recurring issue extracted from the analyses, with run context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugEntry {
    pub pipeline_key: String,
    pub pipeline_name: String,
    pub error_message: String,
    pub frequency: u64,
    pub severity: Severity,
    pub last_seen: String,
    pub affected_step: String,
}

/// Fleet-wide statistics, counted from the logs (not the analyses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStatistics {
    pub pipelines_total: usize,
    pub runs_total: usize,
    pub avg_duration_seconds: u64,
    pub errors_total: usize,
    pub completed_runs: usize,
}

/// The aggregated reporting output: statistics, ranked bugs, and the
/// Markdown narrative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub stats: FleetStatistics,
    pub bugs_summary: Vec<BugEntry>,
    pub markdown: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub run_id: String,
    pub build_number: u64,
    pub step: String,
    pub message: String,
    pub timestamp: String,
}

/// Error statistics for a single pipeline's logs, covering FAILED runs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    pub pipeline_key: String,
    pub pipeline_name: String,
    pub total_runs: usize,
    pub failed_runs: usize,
    pub success_rate: f64,
    pub total_errors: usize,
    pub error_details: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonIssue {
    pub issue: String,
    pub affected_pipelines: usize,
}

/// High-level rollup across all pipeline analyses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total_pipelines: usize,
    pub overall_health: String,
    pub common_issues: Vec<CommonIssue>,
    pub fleet_recommendations: Vec<String>,
}
