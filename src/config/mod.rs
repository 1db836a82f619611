use std::env;
use std::path::PathBuf;

use crate::error::AppError;
use crate::llm::Provider;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub request: RequestConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// LLM provider and model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub ollama_model: String,
    pub ollama_reasoning_model: String,
    pub ollama_base_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub temperature: f64,
    /// Attempts per analysis phase before falling back.
    pub max_retries: u32,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    /// Local inference can take many minutes on large prompts.
    pub ollama_timeout_ms: u64,
}

/// Output directory configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load and validate configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        let config = Self::load_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration without validating it.
    ///
    /// For callers that apply overrides first; call [`Config::validate`] afterwards.
    pub fn load_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let provider: Provider = env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "ollama".to_string())
            .parse()
            .map_err(|message| AppError::Config { message })?;

        let llm = LlmConfig {
            provider,
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen2.5:14b".to_string()),
            ollama_reasoning_model: env::var("OLLAMA_REASONING_MODEL")
                .unwrap_or_else(|_| "deepseek-r1:32b".to_string()),
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            anthropic_base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            temperature: env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.3),
            max_retries: env::var("LLM_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3)
                .max(1),
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120_000),
            ollama_timeout_ms: env::var("OLLAMA_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_800_000),
        };

        let output = OutputConfig {
            output_dir: PathBuf::from(
                env::var("OUTPUT_DIR").unwrap_or_else(|_| "output".to_string()),
            ),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            llm,
            request,
            output,
            logging,
        })
    }

    /// Reject provider selections that cannot authenticate.
    pub fn validate(&self) -> Result<(), AppError> {
        match self.llm.provider {
            Provider::OpenAi if self.llm.openai_api_key.trim().is_empty() => {
                Err(AppError::Config {
                    message: "OPENAI_API_KEY is required when LLM_PROVIDER=openai".to_string(),
                })
            }
            Provider::Anthropic if self.llm.anthropic_api_key.trim().is_empty() => {
                Err(AppError::Config {
                    message: "ANTHROPIC_API_KEY is required when LLM_PROVIDER=anthropic"
                        .to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl LlmConfig {
    /// Model configured for the selected provider.
    pub fn default_model(&self) -> &str {
        match self.provider {
            Provider::Ollama => &self.ollama_model,
            Provider::OpenAi => &self.openai_model,
            Provider::Anthropic => &self.anthropic_model,
        }
    }

    /// Model override for the reasoning client.
    ///
    /// Only the local backend runs a separate chain-of-thought model.
    pub fn reasoning_model_override(&self) -> Option<&str> {
        match self.provider {
            Provider::Ollama => Some(&self.ollama_reasoning_model),
            _ => None,
        }
    }
}

impl OutputConfig {
    /// Directory receiving chunk dumps from the chunker.
    pub fn chunks_dir(&self) -> PathBuf {
        self.output_dir.join("chunks")
    }

    /// Default chunk list read by the CLI.
    pub fn chunks_file(&self) -> PathBuf {
        self.chunks_dir().join("chunks.json")
    }

    /// Directory holding the per-chunk analysis cache.
    pub fn per_chapter_dir(&self) -> PathBuf {
        self.output_dir.join("per_chapter")
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            ollama_model: "qwen2.5:14b".to_string(),
            ollama_reasoning_model: "deepseek-r1:32b".to_string(),
            ollama_base_url: "http://localhost:11434/v1".to_string(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            anthropic_api_key: String::new(),
            anthropic_model: "claude-sonnet-4-20250514".to_string(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            temperature: 0.3,
            max_retries: 3,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
            ollama_timeout_ms: 1_800_000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
