//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Persona injected ahead of every forwarded conversation when the config
/// file does not provide one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and concise assistant. \
Answer the user's questions clearly and accurately. \
If you do not know the answer, say so instead of guessing. \
Keep replies short unless the user asks for more detail.";

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Upstream completion API settings.
    pub upstream: UpstreamConfig,

    /// System prompt injected into every conversation.
    pub prompt: PromptConfig,

    /// Cross-origin allow-list.
    pub cors: CorsConfig,

    /// Fixed-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Payload and conversation size limits.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Upstream completion API configuration.
#[derive(Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible API, without the `/chat/completions` suffix.
    pub base_url: String,

    /// API key sent as a bearer token. Usually left empty in the file and
    /// supplied through `api_key_env`.
    pub api_key: String,

    /// Environment variable consulted when `api_key` is empty.
    pub api_key_env: String,

    /// Model used when the client does not ask for one.
    pub default_model: String,

    /// Additional models clients may select. The default model is always allowed.
    pub allowed_models: Vec<String>,

    /// Sampling temperature forwarded upstream.
    pub temperature: Option<f32>,

    /// Completion token cap forwarded upstream.
    pub max_tokens: Option<u32>,

    /// Total timeout for one upstream call in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            default_model: "gpt-4o-mini".to_string(),
            allowed_models: Vec::new(),
            temperature: Some(0.7),
            max_tokens: Some(512),
            timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

// Hand-written so the key never lands in logs.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("api_key_env", &self.api_key_env)
            .field("default_model", &self.default_model)
            .field("allowed_models", &self.allowed_models)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// System prompt configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    /// Inline system prompt.
    pub system_prompt: String,

    /// File whose contents replace `system_prompt` at load time.
    pub system_prompt_file: Option<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            system_prompt_file: None,
        }
    }
}

/// Cross-origin resource sharing configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins allowed to call the relay. `"*"` allows any origin.
    pub allowed_origins: Vec<String>,

    /// Refuse requests whose `Origin` is not on the list with 403.
    pub reject_disallowed: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            reject_disallowed: true,
            max_age_secs: 600,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Length of one fixed window in seconds.
    pub window_secs: u64,

    /// Requests allowed per client per window.
    pub max_requests: u32,

    /// Key clients by the first `X-Forwarded-For` address instead of the
    /// socket peer. Only enable behind a trusted proxy.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 15 * 60,
            max_requests: 100,
            trust_forwarded_for: false,
        }
    }
}

/// Payload and conversation limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Maximum number of messages in one request.
    pub max_messages: usize,

    /// Maximum characters in a single message.
    pub max_message_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024, // 10KB
            max_messages: 50,
            max_message_chars: 4000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
