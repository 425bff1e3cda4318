//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! relay.toml
//!     → loader.rs (parse, pull API key from env, read prompt file)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → server swaps the per-request settings (upstream, prompt, limits)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Listener, CORS and rate limit settings are fixed at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CorsConfig, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig, PromptConfig,
    RateLimitConfig, RelayConfig, TimeoutConfig, TlsConfig, UpstreamConfig,
    DEFAULT_SYSTEM_PROMPT,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
