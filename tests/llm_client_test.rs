//! Integration tests for the LLM clients
//!
//! Tests request shapes, headers and error mapping per provider using
//! wiremock for request/response mocking.

use std::net::TcpListener;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use thesis_mining::config::{Config, LlmConfig, LoggingConfig, OutputConfig, RequestConfig};
use thesis_mining::error::LlmError;
use thesis_mining::llm::{
    create_client, AnthropicClient, LlmClient, OllamaClient, OpenAiClient, Provider,
};

fn llm_config(base_url: &str) -> LlmConfig {
    LlmConfig {
        ollama_base_url: format!("{}/v1", base_url),
        openai_api_key: "sk-test".to_string(),
        openai_base_url: format!("{}/v1", base_url),
        anthropic_api_key: "sk-ant-test".to_string(),
        anthropic_base_url: base_url.to_string(),
        ..LlmConfig::default()
    }
}

fn request_config() -> RequestConfig {
    RequestConfig {
        timeout_ms: 5000,
        ollama_timeout_ms: 5000,
    }
}

fn chat_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

async fn last_request_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.expect("request recording enabled");
    let last = requests.last().expect("at least one request");
    serde_json::from_slice(&last.body).expect("JSON request body")
}

#[cfg(test)]
mod ollama_tests {
    use super::*;

    #[tokio::test]
    async fn test_ollama_chat_request_shape() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer ollama"))
            .and(body_partial_json(json!({
                "model": "qwen2.5:14b",
                "messages": [
                    {"role": "system", "content": "sistema"},
                    {"role": "user", "content": "usuario"}
                ],
                "temperature": 0.3
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completion("{\"theses\": []}")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = llm_config(&mock_server.uri());
        let client =
            OllamaClient::new(&config, &request_config(), "qwen2.5:14b".to_string()).unwrap();

        let text = client.chat("sistema", "usuario").await.unwrap();
        assert_eq!(text, "{\"theses\": []}");
        assert_eq!(client.model_name(), "qwen2.5:14b");
        assert_eq!(client.provider(), Provider::Ollama);

        let body = last_request_body(&mock_server).await;
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn test_ollama_null_content_is_empty_string() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&mock_server)
            .await;

        let config = llm_config(&mock_server.uri());
        let client = OllamaClient::new(&config, &request_config(), "m".to_string()).unwrap();

        assert_eq!(client.chat("s", "u").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_no_choices_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let config = llm_config(&mock_server.uri());
        let client = OllamaClient::new(&config, &request_config(), "m".to_string()).unwrap();

        let result = client.chat("s", "u").await;
        assert!(matches!(result, Err(LlmError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_completion("{}"))
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&mock_server)
            .await;

        let config = llm_config(&mock_server.uri());
        let request = RequestConfig {
            timeout_ms: 5000,
            ollama_timeout_ms: 100,
        };
        let client = OllamaClient::new(&config, &request, "m".to_string()).unwrap();

        let result = client.chat("s", "u").await;
        assert!(matches!(result, Err(LlmError::Timeout { timeout_ms: 100 })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_http_error() {
        // Reserve a free port, then release it so nothing is listening there
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let config = llm_config(&format!("http://{}", addr));
        let client = OllamaClient::new(&config, &request_config(), "m".to_string()).unwrap();

        let result = client.chat("s", "u").await;
        assert!(matches!(result, Err(LlmError::Http(_))));
    }
}

#[cfg(test)]
mod openai_tests {
    use super::*;

    #[tokio::test]
    async fn test_openai_requests_json_object_output() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completion("{\"chains\": []}")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = llm_config(&mock_server.uri());
        let client = OpenAiClient::new(&config, &request_config(), "gpt-4o".to_string()).unwrap();

        assert_eq!(client.chat("s", "u").await.unwrap(), "{\"chains\": []}");
        assert_eq!(client.provider(), Provider::OpenAi);
    }

    #[tokio::test]
    async fn test_openai_auth_failure_is_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": {"message": "Incorrect API key"}})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = llm_config(&mock_server.uri());
        let client = OpenAiClient::new(&config, &request_config(), "gpt-4o".to_string()).unwrap();

        match client.chat("s", "u").await {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("Incorrect API key"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod anthropic_tests {
    use super::*;

    #[tokio::test]
    async fn test_anthropic_messages_request_shape() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-sonnet-4-20250514",
                "system": "sistema",
                "messages": [{"role": "user", "content": "usuario"}],
                "max_tokens": 8192,
                "temperature": 0.3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": "{\"duplicates\": []}"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 10, "output_tokens": 5}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = llm_config(&mock_server.uri());
        let client = AnthropicClient::new(
            &config,
            &request_config(),
            "claude-sonnet-4-20250514".to_string(),
        )
        .unwrap();

        assert_eq!(client.chat("sistema", "usuario").await.unwrap(), "{\"duplicates\": []}");
        assert_eq!(client.provider(), Provider::Anthropic);
    }

    #[tokio::test]
    async fn test_anthropic_without_text_block_is_empty_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [],
                "stop_reason": "max_tokens"
            })))
            .mount(&mock_server)
            .await;

        let config = llm_config(&mock_server.uri());
        let client = AnthropicClient::new(&config, &request_config(), "m".to_string()).unwrap();

        let result = client.chat("s", "u").await;
        assert!(matches!(result, Err(LlmError::EmptyResponse { .. })));
    }

    #[tokio::test]
    async fn test_anthropic_overloaded_is_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&mock_server)
            .await;

        let config = llm_config(&mock_server.uri());
        let client = AnthropicClient::new(&config, &request_config(), "m".to_string()).unwrap();

        let result = client.chat("s", "u").await;
        assert!(matches!(result, Err(LlmError::Api { status: 529, .. })));
    }
}

#[cfg(test)]
mod factory_tests {
    use super::*;

    fn config(provider: Provider) -> Config {
        Config {
            llm: LlmConfig {
                provider,
                anthropic_api_key: "sk-ant-test".to_string(),
                openai_api_key: "sk-test".to_string(),
                ..LlmConfig::default()
            },
            request: RequestConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_create_client_uses_provider_default_model() {
        let client = create_client(&config(Provider::OpenAi), None).unwrap();
        assert_eq!(client.model_name(), "gpt-4o");
        assert_eq!(client.provider(), Provider::OpenAi);

        let client = create_client(&config(Provider::Anthropic), None).unwrap();
        assert_eq!(client.model_name(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_create_client_honors_override() {
        let config = config(Provider::Ollama);
        let reasoning =
            create_client(&config, config.llm.reasoning_model_override()).unwrap();
        assert_eq!(reasoning.model_name(), "deepseek-r1:32b");

        let blank = create_client(&config, Some("  ")).unwrap();
        assert_eq!(blank.model_name(), "qwen2.5:14b");
    }
}
