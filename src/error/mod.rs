use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Invalid input {path}: {message}")]
    Input { path: String, message: String },
}

/// Transport and backend errors raised by an LLM client.
///
/// The analyzer never retries these; they surface to the pipeline driver.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Recoverable errors turning model output into typed data.
///
/// Raised after JSON recovery; every variant triggers another attempt.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing field: {field}")]
    MissingField { field: String },

    #[error("Invalid field {field}: {message}")]
    InvalidField { field: String, message: String },
}

/// Errors writing or reading analysis artifacts
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for LLM transport operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Result type alias for model-output parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type alias for output operations
pub type OutputResult<T> = Result<T, OutputError>;

impl ParseError {
    /// Shorthand for a missing required key.
    pub fn missing(field: impl Into<String>) -> Self {
        ParseError::MissingField {
            field: field.into(),
        }
    }

    /// Shorthand for a key holding an unusable value.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}
