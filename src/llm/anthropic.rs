use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::{AnthropicRequest, AnthropicResponse};
use super::{map_send_error, LlmClient, Provider};
use crate::config::{LlmConfig, RequestConfig};
use crate::error::{LlmError, LlmResult};

/// Output ceiling for every Anthropic call.
pub const ANTHROPIC_MAX_TOKENS: u32 = 8192;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic messages API
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    timeout_ms: u64,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    pub fn new(config: &LlmConfig, request: &RequestConfig, model: String) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request.timeout_ms))
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.anthropic_base_url.trim_end_matches('/').to_string(),
            api_key: config.anthropic_api_key.clone(),
            model,
            temperature: config.temperature,
            timeout_ms: request.timeout_ms,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat(&self, system: &str, user: &str) -> LlmResult<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let request = AnthropicRequest::new(
            &self.model,
            system,
            user,
            ANTHROPIC_MAX_TOKENS,
            self.temperature,
        );

        debug!(
            model = %self.model,
            prompt_chars = system.len() + user.len(),
            "Sending Anthropic message"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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

        let message: AnthropicResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    message: format!("Failed to parse Anthropic response: {}", e),
                })?;

        let text = message
            .first_text()
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: Provider::Anthropic.to_string(),
            })?
            .to_string();

        info!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis(),
            stop_reason = message.stop_reason.as_deref().unwrap_or("unknown"),
            "Anthropic message succeeded"
        );

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> Provider {
        Provider::Anthropic
    }
}
