//! Minimal client for the chat relay.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: String, // "user" or "assistant"
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("relay returned {status}: {message}")]
    Relay { status: StatusCode, message: String },
}

impl ClientError {
    /// Status returned by the relay, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Relay { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
        }
    }
}

pub struct RelayClient {
    client: Client,
    relay_url: String,
}

impl RelayClient {
    pub fn new(relay_url: &str) -> Self {
        Self {
            client: Client::new(),
            relay_url: relay_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send a conversation and return the assistant's reply.
    pub async fn chat(&self, messages: &[Message], model: Option<&str>) -> Result<ChatReply, ClientError> {
        let resp = self
            .client
            .post(format!("{}/api/chat", self.relay_url))
            .json(&ChatBody { messages, model })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(ClientError::Relay { status, message });
        }

        Ok(resp.json().await?)
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        let resp = self
            .client
            .get(format!("{}/health", self.relay_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}
