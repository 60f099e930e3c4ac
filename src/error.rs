use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipeLensError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("AI request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("AI request rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("AI request timed out: {0}")]
    Timeout(String),

    #[error("Failed to parse AI response as JSON: {0}")]
    JsonParse(String),

    #[error("AI response failed validation: {0}")]
    Validation(String),

    #[error("Workflow failed: {0}")]
    Workflow(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipeLensError>;
