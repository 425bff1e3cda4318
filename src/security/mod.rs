//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight, allow-list, 403 for foreign origins)
//!     → limits.rs (body size, request deadline)
//!     → rate_limit.rs (per-IP fixed window, /api/chat only)
//!     → handler
//!     → headers.rs (security response headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input, including `X-Forwarded-For` unless configured

pub mod cors;
pub mod headers;
pub mod limits;
pub mod rate_limit;
