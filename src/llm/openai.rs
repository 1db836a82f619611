use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use super::{map_send_error, LlmClient, Provider};
use crate::config::{LlmConfig, RequestConfig};
use crate::error::{LlmError, LlmResult};

/// Credential sent to local servers that ignore authentication.
const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

/// Shared transport for the OpenAI chat-completions protocol.
#[derive(Clone)]
struct ChatCompletions {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    timeout_ms: u64,
    json_output: bool,
    provider: Provider,
}

impl ChatCompletions {
    fn new(
        provider: Provider,
        base_url: &str,
        api_key: &str,
        model: String,
        temperature: f64,
        timeout_ms: u64,
        json_output: bool,
    ) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model,
            temperature,
            timeout_ms,
            json_output,
            provider,
        })
    }

    async fn chat(&self, system: &str, user: &str) -> LlmResult<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut request = ChatCompletionRequest::new(&self.model, system, user, self.temperature);
        if self.json_output {
            request = request.with_json_output();
        }

        debug!(
            provider = %self.provider,
            model = %self.model,
            prompt_chars = system.len() + user.len(),
            "Sending chat completion"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout_ms))?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let completion: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    message: format!("Failed to parse chat completion: {}", e),
                })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "Chat completion contained no choices".to_string(),
            })?;

        info!(
            provider = %self.provider,
            model = %self.model,
            latency_ms = start.elapsed().as_millis(),
            "Chat completion succeeded"
        );

        Ok(choice.message.content.unwrap_or_default())
    }
}

/// Local OpenAI-compatible server (Ollama).
#[derive(Clone)]
pub struct OllamaClient {
    inner: ChatCompletions,
}

impl OllamaClient {
    /// Create a client against `ollama_base_url` with the extended local timeout.
    pub fn new(config: &LlmConfig, request: &RequestConfig, model: String) -> LlmResult<Self> {
        Ok(Self {
            inner: ChatCompletions::new(
                Provider::Ollama,
                &config.ollama_base_url,
                OLLAMA_PLACEHOLDER_KEY,
                model,
                config.temperature,
                request.ollama_timeout_ms,
                false,
            )?,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, system: &str, user: &str) -> LlmResult<String> {
        self.inner.chat(system, user).await
    }

    fn model_name(&self) -> &str {
        &self.inner.model
    }

    fn provider(&self) -> Provider {
        Provider::Ollama
    }
}

/// Hosted OpenAI chat completions, always requesting a JSON object.
#[derive(Clone)]
pub struct OpenAiClient {
    inner: ChatCompletions,
}

impl OpenAiClient {
    /// Create a client against `openai_base_url` with the configured API key.
    pub fn new(config: &LlmConfig, request: &RequestConfig, model: String) -> LlmResult<Self> {
        Ok(Self {
            inner: ChatCompletions::new(
                Provider::OpenAi,
                &config.openai_base_url,
                &config.openai_api_key,
                model,
                config.temperature,
                request.timeout_ms,
                true,
            )?,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, system: &str, user: &str) -> LlmResult<String> {
        self.inner.chat(system, user).await
    }

    fn model_name(&self) -> &str {
        &self.inner.model
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let config = LlmConfig {
            ollama_base_url: "http://localhost:11434/v1/".to_string(),
            ..LlmConfig::default()
        };
        let client =
            OllamaClient::new(&config, &RequestConfig::default(), "qwen2.5:14b".to_string())
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434/v1");
        assert_eq!(client.inner.api_key, OLLAMA_PLACEHOLDER_KEY);
        assert_eq!(client.inner.timeout_ms, 1_800_000);
        assert!(!client.inner.json_output);
    }

    #[test]
    fn test_openai_client_requests_json() {
        let config = LlmConfig {
            openai_api_key: "sk-test".to_string(),
            ..LlmConfig::default()
        };
        let client =
            OpenAiClient::new(&config, &RequestConfig::default(), "gpt-4o".to_string()).unwrap();
        assert!(client.inner.json_output);
        assert_eq!(client.inner.timeout_ms, 120_000);
        assert_eq!(client.model_name(), "gpt-4o");
    }
}
