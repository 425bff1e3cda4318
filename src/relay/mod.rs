//! Chat relay core.
//!
//! # Data Flow
//! ```text
//! ChatRequest (client JSON)
//!     → validation.rs (roles, counts, lengths)
//!     → shaping.rs (model selection, system prompt first)
//!     → upstream client
//!     → ChatReply { reply, model }
//! ```

pub mod shaping;
pub mod types;
pub mod validation;

pub use shaping::{build_conversation, select_model};
pub use types::{ChatMessage, ChatReply, ChatRequest, Role};
pub use validation::{validate_request, RequestError};
