//! Outbound calls to the completion API.
//!
//! One POST per client request, no retries, no streaming.

pub mod client;
pub mod types;

pub use client::{normalize, Completion, UpstreamClient, UpstreamError};
pub use types::Usage;
