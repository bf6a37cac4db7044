//! Multi-provider language-model client.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::{AiConfig, ProviderKind};

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout for HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Time allowed for a `claude -p` subprocess to answer.
const CLI_TIMEOUT: Duration = Duration::from_secs(180);

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Set on `claude` subprocesses so their own stop hook skips the run.
pub const CHILD_ENV: &str = "CONTEXT_TRACKER_CHILD";

fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        })
}

/// Retry 5xx responses until the attempt budget is spent.
fn should_retry(status_code: u16, attempt: u32) -> bool {
    attempt < MAX_RETRIES && (500..600).contains(&status_code)
}

/// Exponential backoff: 1s, 2s, 4s.
fn calculate_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt)
}

/// Errors from language-model calls.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("API key not configured (env: {0})")]
    MissingApiKey(String),
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Model request timed out")]
    Timeout,
    #[error("Claude CLI not found: {0}")]
    CliNotFound(String),
    #[error("Claude CLI failed: {0}")]
    CliFailed(String),
}

/// A text-in, text-out model backend.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Generate a response for a system and user prompt.
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError>;
}

/// Send a prepared request, retrying server errors with backoff.
async fn send_with_retry(
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, AiError> {
    let mut attempt = 0;
    loop {
        let Some(builder) = request.try_clone() else {
            return Err(AiError::RequestFailed("request body is not cloneable".to_string()));
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AiError::Timeout
            } else {
                AiError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AiError::ParseError(e.to_string()));
        }

        if should_retry(status.as_u16(), attempt) {
            let backoff = calculate_backoff(attempt);
            tracing::debug!(status = %status, ?backoff, "Retrying model request");
            tokio::time::sleep(backoff).await;
            attempt += 1;
            continue;
        }

        let text = response.text().await.unwrap_or_default();
        return Err(AiError::RequestFailed(format!("HTTP {status}: {text}")));
    }
}

/// Gemini API provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: build_http_client(),
            base_url,
            api_key,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": user }]
            }],
            "systemInstruction": {
                "parts": [{ "text": system }]
            },
            "generationConfig": {
                "maxOutputTokens": self.max_tokens
            }
        });

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let json = send_with_retry(request).await?;
        json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AiError::ParseError("No text in Gemini response".to_string()))
    }
}

/// Anthropic Messages API provider.
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeProvider {
    #[must_use]
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: build_http_client(),
            base_url,
            api_key,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl AiProvider for ClaudeProvider {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [{
                "role": "user",
                "content": user
            }]
        });

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body);

        let json = send_with_retry(request).await?;
        json["content"][0]["text"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AiError::ParseError("No text in Claude response".to_string()))
    }
}

/// Local `claude` CLI in print mode; the prompt goes over stdin.
#[derive(Debug, Clone)]
pub struct ClaudeCliProvider {
    cli_path: String,
    model: String,
}

impl ClaudeCliProvider {
    #[must_use]
    pub fn new(cli_path: String, model: String) -> Self {
        Self { cli_path, model }
    }

    /// Arguments passed to the CLI.
    #[must_use]
    pub fn build_args(&self, system: &str) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "text".to_string(),
        ];
        if !self.model.is_empty() {
            args.push("--model".to_string());
            args.push(self.model.clone());
        }
        if !system.is_empty() {
            args.push("--system-prompt".to_string());
            args.push(system.to_string());
        }
        args
    }
}

#[async_trait]
impl AiProvider for ClaudeCliProvider {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        let mut child = Command::new(&self.cli_path)
            .args(self.build_args(system))
            .env(CHILD_ENV, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AiError::CliNotFound(self.cli_path.clone()),
                _ => AiError::CliFailed(e.to_string()),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(user.as_bytes())
                .await
                .map_err(|e| AiError::CliFailed(format!("writing prompt: {e}")))?;
        }

        let output = tokio::time::timeout(CLI_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| AiError::Timeout)?
            .map_err(|e| AiError::CliFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AiError::CliFailed(format!(
                "{}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(AiError::ParseError("Empty CLI response".to_string()));
        }
        Ok(text)
    }
}

/// Provider enum for dispatch.
#[derive(Debug, Clone)]
pub enum Provider {
    Gemini(GeminiProvider),
    Claude(ClaudeProvider),
    ClaudeCli(ClaudeCliProvider),
}

#[async_trait]
impl AiProvider for Provider {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        match self {
            Self::Gemini(p) => p.generate(system, user).await,
            Self::Claude(p) => p.generate(system, user).await,
            Self::ClaudeCli(p) => p.generate(system, user).await,
        }
    }
}

/// Configured model client.
#[derive(Debug, Clone)]
pub struct AiClient {
    provider: Provider,
    config: AiConfig,
}

impl AiClient {
    #[must_use]
    pub fn new(provider: Provider, config: AiConfig) -> Self {
        Self { provider, config }
    }

    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AiError::MissingApiKey` if an HTTP provider is selected and
    /// its API key environment variable is not set.
    pub fn from_config(config: AiConfig) -> Result<Self, AiError> {
        let api_key = || {
            std::env::var(&config.api_key_env)
                .map_err(|_| AiError::MissingApiKey(config.api_key_env.clone()))
        };

        let provider = match config.provider {
            ProviderKind::Gemini => Provider::Gemini(GeminiProvider::new(
                config.base_url.clone(),
                api_key()?,
                config.model.clone(),
                config.max_tokens,
            )),
            ProviderKind::Claude => Provider::Claude(ClaudeProvider::new(
                config.base_url.clone(),
                api_key()?,
                config.model.clone(),
                config.max_tokens,
            )),
            ProviderKind::ClaudeCli => Provider::ClaudeCli(ClaudeCliProvider::new(
                config.cli_path.clone(),
                config.model.clone(),
            )),
        };

        Ok(Self { provider, config })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    #[must_use]
    pub fn provider_kind(&self) -> &ProviderKind {
        &self.config.provider
    }
}

#[async_trait]
impl AiProvider for AiClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        tracing::debug!(provider = ?self.config.provider, model = %self.config.model, "Calling model");
        self.provider.generate(system, user).await
    }
}

/// Extract the first balanced JSON object from response text.
///
/// Braces inside JSON strings are ignored.
///
/// # Errors
///
/// Returns `AiError::ParseError` if no JSON object is found or parsing fails.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let json_start = text
        .find('{')
        .ok_or_else(|| AiError::ParseError(format!("No JSON object found in response: {text}")))?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut json_end = None;
    for (i, c) in text[json_start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    json_end = Some(json_start + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let json_end =
        json_end.ok_or_else(|| AiError::ParseError("Unterminated JSON object".to_string()))?;
    serde_json::from_str(&text[json_start..json_end])
        .map_err(|e| AiError::ParseError(format!("Failed to parse JSON: {e}")))
}

/// Text between `<tag>` and `</tag>`, trimmed. `None` if either tag is
/// missing or the content is blank.
#[must_use]
pub fn extract_tagged(text: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let start = text.find(&open)? + open.len();
    let end = start + text[start..].find(&close)?;
    let content = text[start..end].trim();
    (!content.is_empty()).then(|| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
    }

    #[test]
    fn test_should_retry_logic() {
        assert!(should_retry(500, 0));
        assert!(should_retry(502, 1));
        assert!(should_retry(503, 2));
        assert!(!should_retry(500, MAX_RETRIES));
        assert!(!should_retry(400, 0));
        assert!(!should_retry(429, 0));
        assert!(!should_retry(200, 0));
    }

    #[test]
    fn test_calculate_backoff() {
        assert_eq!(calculate_backoff(0).as_secs(), 1);
        assert_eq!(calculate_backoff(1).as_secs(), 2);
        assert_eq!(calculate_backoff(2).as_secs(), 4);
    }

    #[test]
    fn test_extract_json_with_surrounding_text() {
        let text = r#"Sure! {"name": "wiki"} Hope that helps."#;
        let sample: Sample = extract_json(text).unwrap();
        assert_eq!(sample.name, "wiki");
    }

    #[test]
    fn test_extract_json_ignores_braces_in_strings() {
        let text = r#"```json
{"name": "use {braces} and \"quotes\""}
```"#;
        let sample: Sample = extract_json(text).unwrap();
        assert_eq!(sample.name, r#"use {braces} and "quotes""#);
    }

    #[test]
    fn test_extract_json_errors() {
        assert!(extract_json::<Sample>("No JSON here").is_err());
        assert!(extract_json::<Sample>(r#"{"name": "open"#).is_err());
    }

    #[test]
    fn test_extract_tagged() {
        let text = "Here:\n<architecture_md>\n# Overview\n</architecture_md>\nDone";
        assert_eq!(
            extract_tagged(text, "architecture_md").as_deref(),
            Some("# Overview")
        );
        assert!(extract_tagged("<architecture_md>  </architecture_md>", "architecture_md").is_none());
        assert!(extract_tagged("<architecture_md> no close", "architecture_md").is_none());
        assert!(extract_tagged("nothing", "architecture_md").is_none());
    }

    #[test]
    fn test_cli_args() {
        let provider = ClaudeCliProvider::new("claude".to_string(), "haiku".to_string());
        let args = provider.build_args("be brief");
        assert_eq!(args[0], "-p");
        assert!(args.windows(2).any(|w| w[0] == "--model" && w[1] == "haiku"));
        assert!(args.windows(2).any(|w| w[0] == "--system-prompt" && w[1] == "be brief"));
    }

    #[tokio::test]
    async fn test_cli_not_found() {
        let provider = ClaudeCliProvider::new(
            "/nonexistent/claude-binary".to_string(),
            String::new(),
        );
        let err = provider.generate("sys", "user").await.unwrap_err();
        assert!(matches!(err, AiError::CliNotFound(_)));
    }

    #[test]
    fn test_from_config_cli_needs_no_key() {
        let client = AiClient::from_config(AiConfig::default()).unwrap();
        assert!(matches!(client.provider, Provider::ClaudeCli(_)));
        assert_eq!(client.provider_kind(), &ProviderKind::ClaudeCli);
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = AiConfig {
            provider: ProviderKind::Claude,
            api_key_env: "CONTEXT_TRACKER_TEST_UNSET_KEY".to_string(),
            ..AiConfig::default()
        };
        let result = AiClient::from_config(config);
        assert!(matches!(result, Err(AiError::MissingApiKey(_))));
    }

    #[test]
    fn test_from_config_gemini() {
        std::env::set_var("CONTEXT_TRACKER_TEST_GEMINI_KEY", "test-key");
        let config = AiConfig {
            provider: ProviderKind::Gemini,
            model: "gemini-3-flash".to_string(),
            base_url: "http://localhost:8045/v1beta".to_string(),
            api_key_env: "CONTEXT_TRACKER_TEST_GEMINI_KEY".to_string(),
            ..AiConfig::default()
        };
        let client = AiClient::from_config(config).unwrap();
        assert!(matches!(client.provider, Provider::Gemini(_)));
        assert_eq!(client.model(), "gemini-3-flash");
        std::env::remove_var("CONTEXT_TRACKER_TEST_GEMINI_KEY");
    }
}
