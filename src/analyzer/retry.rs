//! Shared request/parse/retry loop used by every analysis phase.

use serde_json::Value;
use tracing::{error, warn};

use crate::error::{LlmResult, ParseResult};
use crate::json::{parse_completion, strip_thinking_tags};
use crate::llm::LlmClient;

/// One structured exchange with a model: prompt, recover JSON, parse, retry.
///
/// Parse failures are retried up to `max_attempts` times and then replaced
/// by the phase fallback. Transport errors from the client return at once.
pub(crate) struct StructuredCall<'a> {
    pub phase: &'a str,
    pub client: &'a dyn LlmClient,
    /// Reasoning models may prefix their answer with `<think>` blocks.
    pub strip_thinking: bool,
    pub max_attempts: u32,
}

impl StructuredCall<'_> {
    pub async fn run<T, P, F>(
        &self,
        system: &str,
        user: &str,
        parse: P,
        fallback: F,
    ) -> LlmResult<T>
    where
        P: Fn(Value) -> ParseResult<T>,
        F: FnOnce() -> T,
    {
        for attempt in 1..=self.max_attempts {
            let raw = self.client.chat(system, user).await?;
            let raw = if self.strip_thinking {
                strip_thinking_tags(&raw)
            } else {
                raw
            };

            match parse_completion(&raw).and_then(&parse) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        phase = %self.phase,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        completion_preview = %raw.chars().take(200).collect::<String>(),
                        "Structured response attempt failed"
                    );
                }
            }
        }

        error!(
            phase = %self.phase,
            attempts = self.max_attempts,
            "All attempts failed, using fallback"
        );
        Ok(fallback())
    }
}
