//! Client for the upstream completion API.

use std::time::Duration;

use axum::http::StatusCode;
use reqwest::Client;

use crate::config::UpstreamConfig;
use crate::relay::ChatMessage;
use crate::upstream::types::{CompletionRequest, CompletionResponse, Usage};

/// Normalized result of one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Trimmed text of the first choice.
    pub reply: String,
    /// Model reported by the upstream, falling back to the one requested.
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid upstream response: {0}")]
    Decode(String),
    #[error("upstream returned an empty completion")]
    EmptyCompletion,
}

impl UpstreamError {
    /// Status reported to the client for this failure.
    pub fn client_status(&self) -> StatusCode {
        match self {
            UpstreamError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Decode(e.to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// Shared HTTP client for the upstream API.
///
/// Endpoint, key and timeouts are read from the config passed to each call,
/// so hot-reloaded settings apply to the next request.
#[derive(Clone)]
pub struct UpstreamClient {
    http_client: Client,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("chat-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self { http_client })
    }

    /// Send one conversation upstream and unwrap the reply text.
    pub async fn complete(
        &self,
        config: &UpstreamConfig,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, UpstreamError> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let body = CompletionRequest {
            model,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        tracing::debug!(url = %url, model = %model, messages = messages.len(), "Sending completion request");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&config.api_key)
            .timeout(Duration::from_secs(config.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(UpstreamError::Status { status, body });
        }

        let parsed: CompletionResponse = response.json().await.map_err(UpstreamError::from_reqwest)?;
        normalize(parsed, model)
    }
}

/// Bytes of an upstream error body kept for the logs.
const ERROR_BODY_LIMIT: usize = 4 * 1024;

/// Read at most [`ERROR_BODY_LIMIT`] bytes of an error response.
async fn read_error_body(mut response: reqwest::Response) -> String {
    let mut buf = Vec::new();
    while buf.len() < ERROR_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    buf.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Reduce an upstream response to the first choice's text.
pub fn normalize(response: CompletionResponse, requested_model: &str) -> Result<Completion, UpstreamError> {
    let usage = response.usage;
    let model = response
        .model
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| requested_model.to_string());

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(UpstreamError::EmptyCompletion)?;

    let reply = choice
        .message
        .content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(UpstreamError::EmptyCompletion)?;

    Ok(Completion {
        reply,
        model,
        finish_reason: choice.finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CompletionResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_takes_first_choice() {
        let response = parse(
            r#"{
                "id": "chatcmpl-1",
                "model": "gpt-4o-mini-2024-07-18",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "  Hello there!\n"}, "finish_reason": "stop"},
                    {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
                ],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            }"#,
        );

        let completion = normalize(response, "gpt-4o-mini").unwrap();
        assert_eq!(completion.reply, "Hello there!");
        assert_eq!(completion.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert_eq!(completion.usage, Some(Usage { prompt_tokens: 12, completion_tokens: 3 }));
    }

    #[test]
    fn test_normalize_falls_back_to_requested_model() {
        let response = parse(r#"{"choices": [{"message": {"content": "ok"}}]}"#);
        assert_eq!(normalize(response, "gpt-4o").unwrap().model, "gpt-4o");
    }

    #[test]
    fn test_normalize_rejects_missing_or_blank_content() {
        for json in [
            r#"{"choices": []}"#,
            r#"{}"#,
            r#"{"choices": [{"message": {"content": null}}]}"#,
            r#"{"choices": [{"message": {"content": "   "}}]}"#,
        ] {
            assert!(matches!(normalize(parse(json), "m"), Err(UpstreamError::EmptyCompletion)), "{json}");
        }
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = CompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: None,
            max_tokens: Some(64),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ],
                "max_tokens": 64
            })
        );
    }

    #[tokio::test]
    async fn test_error_body_is_capped() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let body = "x".repeat(256 * 1024);
            let head = format!(
                "HTTP/1.1 500 Internal Server Error\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body.as_bytes()).await;
        });

        let config = UpstreamConfig {
            base_url: format!("http://{addr}/v1"),
            api_key: "sk-test".into(),
            ..UpstreamConfig::default()
        };
        let client = UpstreamClient::new(&config).unwrap();
        let err = client
            .complete(&config, "gpt-4o-mini", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();

        match err {
            UpstreamError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body.len(), ERROR_BODY_LIMIT);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_client_status_mapping() {
        assert_eq!(UpstreamError::Timeout.client_status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(UpstreamError::EmptyCompletion.client_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            UpstreamError::Status { status: StatusCode::TOO_MANY_REQUESTS, body: String::new() }.client_status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
