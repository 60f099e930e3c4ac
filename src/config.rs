use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::PipeLensError;

const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Configuration file structure for PipeLens.
///
/// Allows users to save Azure AI connection settings and reuse them across
/// runs. Environment variables always take precedence over file values.
/// Configuration files are loaded from the current directory, the user config
/// directory, or a specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Azure OpenAI connection settings
    #[serde(default)]
    pub azure: AzureConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AzureConfig {
    /// Azure OpenAI endpoint URL
    pub endpoint: Option<String>,

    /// Azure OpenAI API key
    pub api_key: Option<String>,

    /// Chat model deployment name (e.g. 'gpt-4o')
    pub deployment: Option<String>,

    /// API version (defaults to 2024-02-01)
    pub api_version: Option<String>,

    /// Optional dedicated deployment for report generation
    pub reporting_deployment: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: Option<f64>,

    /// Maximum number of retries for failed requests
    pub max_retries: Option<u32>,

    /// Base delay between retries in seconds
    pub retry_delay_seconds: Option<f64>,
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./pipelens.toml
    /// 3. ./pipelens.json
    /// 4. ./pipelens.yaml
    /// 5. ./pipelens.yml
    /// 6. <user config dir>/pipelens/pipelens.toml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "pipelens.toml",
            "pipelens.json",
            "pipelens.yaml",
            "pipelens.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("pipelens").join("pipelens.toml");
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // No config file found, return defaults
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }
}

/// Fully resolved Azure AI settings.
///
/// Required settings must all be present before any network call; resolution
/// fails fast with the complete list of missing names.
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub reporting_deployment: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl AiSettings {
    /// Resolve settings from environment variables, falling back to the
    /// configuration file values.
    pub fn resolve(config: &Config) -> crate::error::Result<Self> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    fn resolve_with(
        config: &Config,
        env: impl Fn(&str) -> Option<String>,
    ) -> crate::error::Result<Self> {
        let azure = &config.azure;

        let endpoint = env("AZURE_OPENAI_ENDPOINT").or_else(|| azure.endpoint.clone());
        let api_key = env("AZURE_OPENAI_API_KEY").or_else(|| azure.api_key.clone());
        let deployment = env("AZURE_OPENAI_DEPLOYMENT_NAME").or_else(|| azure.deployment.clone());

        let mut missing = Vec::new();
        if endpoint.is_none() {
            missing.push("AZURE_OPENAI_ENDPOINT");
        }
        if api_key.is_none() {
            missing.push("AZURE_OPENAI_API_KEY");
        }
        if deployment.is_none() {
            missing.push("AZURE_OPENAI_DEPLOYMENT_NAME");
        }

        if !missing.is_empty() {
            return Err(PipeLensError::Config(format!(
                "Missing required Azure AI settings: {}. \
                 Set them in the environment or a pipelens config file.",
                missing.join(", ")
            )));
        }

        let timeout_seconds = env("AZURE_TIMEOUT_SECONDS")
            .and_then(|v| v.parse().ok())
            .or(azure.timeout_seconds)
            .unwrap_or(30.0);
        let max_retries = env("AZURE_MAX_RETRIES")
            .and_then(|v| v.parse().ok())
            .or(azure.max_retries)
            .unwrap_or(3);
        let retry_delay_seconds = env("AZURE_RETRY_DELAY_SECONDS")
            .and_then(|v| v.parse().ok())
            .or(azure.retry_delay_seconds)
            .unwrap_or(1.0);

        Ok(Self {
            endpoint: endpoint.unwrap_or_default(),
            api_key: api_key.unwrap_or_default(),
            deployment: deployment.unwrap_or_default(),
            api_version: env("AZURE_API_VERSION")
                .or_else(|| azure.api_version.clone())
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            reporting_deployment: env("AZURE_REPORTING_DEPLOYMENT_NAME")
                .or_else(|| azure.reporting_deployment.clone()),
            timeout: Duration::from_secs_f64(timeout_seconds),
            max_retries,
            retry_delay: Duration::from_secs_f64(retry_delay_seconds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.azure.endpoint.is_none());
        assert!(config.azure.api_key.is_none());
        assert!(config.azure.reporting_deployment.is_none());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[azure]
endpoint = "https://example.openai.azure.com"
api-key = "test-key"
deployment = "gpt-4o"
max-retries = 5
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(
            config.azure.endpoint,
            Some("https://example.openai.azure.com".to_string())
        );
        assert_eq!(config.azure.api_key, Some("test-key".to_string()));
        assert_eq!(config.azure.deployment, Some("gpt-4o".to_string()));
        assert_eq!(config.azure.max_retries, Some(5));
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "azure": {
    "endpoint": "https://json.openai.azure.com",
    "api-key": "json-key",
    "deployment": "gpt-4o-mini"
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(
            config.azure.endpoint,
            Some("https://json.openai.azure.com".to_string())
        );
        assert_eq!(config.azure.deployment, Some("gpt-4o-mini".to_string()));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load(Some(Path::new("nonexistent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_missing_settings_enumerated() {
        let config = Config::default();
        let err = AiSettings::resolve_with(&config, no_env).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("AZURE_OPENAI_ENDPOINT"));
        assert!(message.contains("AZURE_OPENAI_API_KEY"));
        assert!(message.contains("AZURE_OPENAI_DEPLOYMENT_NAME"));
    }

    #[test]
    fn test_resolve_partial_settings_lists_only_missing() {
        let config = Config {
            azure: AzureConfig {
                endpoint: Some("https://example.openai.azure.com".to_string()),
                ..AzureConfig::default()
            },
        };
        let err = AiSettings::resolve_with(&config, no_env).unwrap_err();
        let message = err.to_string();
        assert!(!message.contains("AZURE_OPENAI_ENDPOINT,"));
        assert!(message.contains("AZURE_OPENAI_API_KEY"));
        assert!(message.contains("AZURE_OPENAI_DEPLOYMENT_NAME"));
    }

    #[test]
    fn test_resolve_from_config_file_values() {
        let config = Config {
            azure: AzureConfig {
                endpoint: Some("https://example.openai.azure.com".to_string()),
                api_key: Some("file-key".to_string()),
                deployment: Some("gpt-4o".to_string()),
                timeout_seconds: Some(10.0),
                retry_delay_seconds: Some(0.5),
                ..AzureConfig::default()
            },
        };
        let settings = AiSettings::resolve_with(&config, no_env).unwrap();
        assert_eq!(settings.endpoint, "https://example.openai.azure.com");
        assert_eq!(settings.api_version, DEFAULT_API_VERSION);
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.retry_delay, Duration::from_millis(500));
        assert_eq!(settings.max_retries, 3);
    }

    #[test]
    fn test_resolve_env_overrides_file() {
        let config = Config {
            azure: AzureConfig {
                endpoint: Some("https://file.openai.azure.com".to_string()),
                api_key: Some("file-key".to_string()),
                deployment: Some("file-deployment".to_string()),
                ..AzureConfig::default()
            },
        };
        let settings = AiSettings::resolve_with(&config, |name| match name {
            "AZURE_OPENAI_ENDPOINT" => Some("https://env.openai.azure.com".to_string()),
            "AZURE_REPORTING_DEPLOYMENT_NAME" => Some("gpt-4o-reports".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.endpoint, "https://env.openai.azure.com");
        assert_eq!(settings.api_key, "file-key");
        assert_eq!(
            settings.reporting_deployment,
            Some("gpt-4o-reports".to_string())
        );
    }
}
