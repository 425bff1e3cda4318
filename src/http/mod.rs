//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (x-request-id assigned)
//!     → chat.rs (POST /api/chat) | health.rs (GET /health)
//!     → response.rs (errors rendered as JSON)
//!     → Send to client
//! ```

pub mod chat;
pub mod health;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::RelayError;
pub use server::{AppState, HttpServer};
