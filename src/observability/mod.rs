//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!
//! Every request:
//!     → access log span (method, path, x-request-id)
//!     → one response line (status, latency)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all log lines of a request via the span
//! - No metrics endpoint; the access log is the only telemetry

pub mod logging;
