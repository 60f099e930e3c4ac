use async_trait::async_trait;
use log::warn;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::AiSettings;
use crate::error::{PipeLensError, Result};

const MAX_COMPLETION_TOKENS: u32 = 4000;
const TEXT_TEMPERATURE: f32 = 0.1;
const JSON_TEMPERATURE: f32 = 0.0;

/// Outcome of an AI attempt that has a deterministic fallback.
///
/// Callers branch on this tag instead of intercepting errors: a `Fallback`
/// carries the reason the AI path was abandoned, and the caller substitutes
/// its heuristic result.
#[derive(Debug)]
pub enum AiOutcome<T> {
    Completed(T),
    Fallback { reason: String },
}

/// Text and JSON completion capability.
///
/// The orchestrator receives this as an injected trait object so tests can
/// substitute canned or failing backends.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Generate a free-text completion.
    async fn generate_text(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Generate a JSON completion constrained by a schema hint.
    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema_hint: &str,
    ) -> Result<Value>;

    /// Generate report prose. Implementations may route this to a dedicated
    /// reporting deployment; the default is the general text path.
    async fn generate_report(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.generate_text(system_prompt, user_prompt).await
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Azure OpenAI chat-completions client.
///
/// Requests are retried a bounded number of times: transport errors and
/// timeouts back off linearly on the configured delay, 429 responses honor
/// the `retry-after` hint. Other HTTP errors surface immediately.
pub struct AzureAiClient {
    client: Client,
    chat_url: Url,
    report_url: Option<Url>,
    api_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl AzureAiClient {
    pub fn new(settings: &AiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("PipeLens/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| PipeLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let chat_url = deployment_url(&settings.endpoint, &settings.deployment, &settings.api_version)?;
        let report_url = settings
            .reporting_deployment
            .as_deref()
            .map(|deployment| deployment_url(&settings.endpoint, deployment, &settings.api_version))
            .transpose()?;

        Ok(Self {
            client,
            chat_url,
            report_url,
            api_key: settings.api_key.clone(),
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay,
        })
    }

    /// Execute a chat-completions request with bounded retries.
    async fn complete(&self, url: &Url, messages: Vec<ChatMessage>, temperature: f32) -> Result<String> {
        let payload = ChatRequest {
            messages,
            temperature,
            max_tokens: MAX_COMPLETION_TOKENS,
            top_p: 0.95,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };

        let mut attempt = 0;
        loop {
            let request = self
                .client
                .post(url.clone())
                .header("api-key", &self.api_key)
                .json(&payload);

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() => {
                    if attempt >= self.max_retries {
                        return Err(PipeLensError::Timeout(format!(
                            "no response after {} attempts",
                            attempt + 1
                        )));
                    }
                    let delay = self.retry_delay * (attempt + 1);
                    warn!(
                        "AI request timed out, retrying in {delay:?} ({}/{})...",
                        attempt + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) if e.is_connect() || e.is_request() => {
                    if attempt >= self.max_retries {
                        return Err(e.into());
                    }
                    let delay = self.retry_delay * (attempt + 1);
                    warn!(
                        "Network error ({e}), retrying in {delay:?} ({}/{})...",
                        attempt + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.max_retries {
                    return Err(PipeLensError::RateLimited {
                        retries: self.max_retries,
                    });
                }
                let delay = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<f64>().ok())
                    .map(Duration::from_secs_f64)
                    .unwrap_or(self.retry_delay);
                warn!(
                    "AI request rate limited, retrying in {delay:?} ({}/{})...",
                    attempt + 1,
                    self.max_retries
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(PipeLensError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: ChatResponse = response.json().await?;
            return body
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| PipeLensError::Api {
                    status: status.as_u16(),
                    message: "No choices in response".to_string(),
                });
        }
    }
}

#[async_trait]
impl Completion for AzureAiClient {
    async fn generate_text(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let messages = vec![
            ChatMessage {
                role: "system",
                content: system_prompt.to_string(),
            },
            ChatMessage {
                role: "user",
                content: user_prompt.to_string(),
            },
        ];
        self.complete(&self.chat_url, messages, TEXT_TEMPERATURE).await
    }

    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema_hint: &str,
    ) -> Result<Value> {
        let enhanced_system_prompt = format!(
            "{system_prompt}\n\n\
             IMPORTANT: You must respond with valid JSON only. Do not include any explanations,\n\
             markdown formatting, or text outside the JSON structure.\n\n\
             Expected response schema hint: {schema_hint}\n\n\
             Respond with valid JSON that matches the expected structure."
        );

        let messages = vec![
            ChatMessage {
                role: "system",
                content: enhanced_system_prompt,
            },
            ChatMessage {
                role: "user",
                content: user_prompt.to_string(),
            },
        ];
        let response_text = self.complete(&self.chat_url, messages, JSON_TEMPERATURE).await?;
        ensure_json(&response_text)
    }

    async fn generate_report(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = self.report_url.as_ref().unwrap_or(&self.chat_url);
        let messages = vec![
            ChatMessage {
                role: "system",
                content: system_prompt.to_string(),
            },
            ChatMessage {
                role: "user",
                content: user_prompt.to_string(),
            },
        ];
        self.complete(url, messages, TEXT_TEMPERATURE).await
    }
}

fn deployment_url(endpoint: &str, deployment: &str, api_version: &str) -> Result<Url> {
    let url = format!(
        "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
        endpoint.trim_end_matches('/')
    );
    Url::parse(&url).map_err(|e| PipeLensError::Config(format!("Invalid endpoint URL: {e}")))
}

/// Extract and parse JSON from a model response, stripping markdown code
/// fences if present.
pub fn ensure_json(response_text: &str) -> Result<Value> {
    let cleaned = strip_code_fences(response_text);
    serde_json::from_str(cleaned).map_err(|e| {
        PipeLensError::JsonParse(format!("{e}; response text: {cleaned}"))
    })
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```") {
        let inner = &trimmed[start + 3..];
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        if let Some(end) = inner.rfind("```") {
            return inner[..end].trim();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_settings(endpoint: &str) -> AiSettings {
        AiSettings {
            endpoint: endpoint.to_string(),
            api_key: "test-key".to_string(),
            deployment: "gpt-4o".to_string(),
            api_version: "2024-02-01".to_string(),
            reporting_deployment: None,
            timeout: Duration::from_secs(5),
            max_retries: 1,
            retry_delay: Duration::from_millis(0),
        }
    }

    fn chat_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[test]
    fn test_strip_code_fences_plain() {
        assert_eq!(strip_code_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_strip_code_fences_json_fence() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_anonymous_fence() {
        let fenced = "Here you go:\n```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
    }

    #[test]
    fn test_ensure_json_rejects_invalid() {
        let err = ensure_json("not json at all").unwrap_err();
        assert!(matches!(err, PipeLensError::JsonParse(_)));
    }

    #[test]
    fn test_deployment_url_trims_trailing_slash() {
        let url = deployment_url("https://example.openai.azure.com/", "gpt-4o", "2024-02-01").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-01"
        );
    }

    #[tokio::test]
    async fn test_generate_text_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/gpt-4o/chat/completions")
            .match_query(Matcher::UrlEncoded(
                "api-version".into(),
                "2024-02-01".into(),
            ))
            .match_header("api-key", "test-key")
            .with_status(200)
            .with_body(chat_body("hello from the model"))
            .create_async()
            .await;

        let client = AzureAiClient::new(&test_settings(&server.url())).unwrap();
        let text = client.generate_text("system", "user").await.unwrap();
        assert_eq!(text, "hello from the model");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_json_strips_fences() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/openai/deployments/gpt-4o/chat/completions")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("valid JSON only".to_string()))
            .with_status(200)
            .with_body(chat_body("```json\n{\"pipelineKey\": \"PROJ-PLAN1\"}\n```"))
            .create_async()
            .await;

        let client = AzureAiClient::new(&test_settings(&server.url())).unwrap();
        let value = client
            .generate_json("system", "user", "{\"pipelineKey\": \"string\"}")
            .await
            .unwrap();
        assert_eq!(value["pipelineKey"], "PROJ-PLAN1");
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/gpt-4o/chat/completions")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(2)
            .create_async()
            .await;

        let client = AzureAiClient::new(&test_settings(&server.url())).unwrap();
        let err = client.generate_text("system", "user").await.unwrap_err();
        assert!(matches!(err, PipeLensError::RateLimited { retries: 1 }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/gpt-4o/chat/completions")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("internal error")
            .expect(1)
            .create_async()
            .await;

        let client = AzureAiClient::new(&test_settings(&server.url())).unwrap();
        let err = client.generate_text("system", "user").await.unwrap_err();
        assert!(matches!(err, PipeLensError::Api { status: 500, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/openai/deployments/gpt-4o/chat/completions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let client = AzureAiClient::new(&test_settings(&server.url())).unwrap();
        let err = client.generate_text("system", "user").await.unwrap_err();
        assert!(matches!(err, PipeLensError::Api { .. }));
    }

    #[tokio::test]
    async fn test_generate_report_prefers_reporting_deployment() {
        let mut server = mockito::Server::new_async().await;
        let report_mock = server
            .mock("POST", "/openai/deployments/gpt-4o-reports/chat/completions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(chat_body("# Report"))
            .create_async()
            .await;

        let mut settings = test_settings(&server.url());
        settings.reporting_deployment = Some("gpt-4o-reports".to_string());
        let client = AzureAiClient::new(&settings).unwrap();
        let text = client.generate_report("system", "user").await.unwrap();
        assert_eq!(text, "# Report");
        report_mock.assert_async().await;
    }
}
