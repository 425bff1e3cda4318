//! Chat relay library.
//!
//! A single-endpoint HTTP relay in front of an OpenAI-compatible completion
//! API: validate the client conversation, inject the system prompt, forward,
//! and return the reply text.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod security;
pub mod upstream;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
