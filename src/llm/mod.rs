//! LLM client abstraction.
//!
//! One [`LlmClient`] implementation per backend, selected once by
//! [`create_client`]. Clients make exactly one network call per
//! [`LlmClient::chat`] and never retry; retries belong to the analyzer.

mod anthropic;
mod openai;
mod types;

pub use anthropic::AnthropicClient;
pub use openai::{OllamaClient, OpenAiClient};
pub use types::*;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{LlmError, LlmResult};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Local OpenAI-compatible server.
    Ollama,
    /// Hosted OpenAI chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
}

impl Provider {
    /// Lowercase identifier used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(format!(
                "unknown LLM provider '{}' (expected ollama|openai|anthropic)",
                other
            )),
        }
    }
}

/// Uniform chat interface over every backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a system + user prompt pair and return the response text.
    async fn chat(&self, system: &str, user: &str) -> LlmResult<String>;

    /// Resolved model name: explicit override, else the provider's configured model.
    fn model_name(&self) -> &str;

    /// Backend this client talks to.
    fn provider(&self) -> Provider;
}

/// Build the client for the configured provider.
pub fn create_client(
    config: &Config,
    model_override: Option<&str>,
) -> LlmResult<Arc<dyn LlmClient>> {
    let model = model_override
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| config.llm.default_model())
        .to_string();

    let client: Arc<dyn LlmClient> = match config.llm.provider {
        Provider::Ollama => Arc::new(OllamaClient::new(&config.llm, &config.request, model)?),
        Provider::OpenAi => Arc::new(OpenAiClient::new(&config.llm, &config.request, model)?),
        Provider::Anthropic => {
            Arc::new(AnthropicClient::new(&config.llm, &config.request, model)?)
        }
    };
    Ok(client)
}

/// Map a reqwest send failure to the client error taxonomy.
pub(crate) fn map_send_error(err: reqwest::Error, timeout_ms: u64) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout { timeout_ms }
    } else {
        LlmError::Http(err)
    }
}
