//! Turns a validated client request into the upstream conversation.

use crate::config::UpstreamConfig;
use crate::relay::types::ChatMessage;
use crate::relay::validation::RequestError;

/// Pick the model for a request.
///
/// No model means the configured default. The default is always allowed;
/// anything else has to be on `allowed_models`.
pub fn select_model(requested: Option<&str>, upstream: &UpstreamConfig) -> Result<String, RequestError> {
    match requested.map(str::trim) {
        None | Some("") => Ok(upstream.default_model.clone()),
        Some(model) if model == upstream.default_model => Ok(model.to_string()),
        Some(model) if upstream.allowed_models.iter().any(|m| m == model) => Ok(model.to_string()),
        Some(model) => Err(RequestError::ModelNotAllowed(model.to_string())),
    }
}

/// Prepend the system prompt to the client's messages.
pub fn build_conversation(system_prompt: &str, messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut conversation = Vec::with_capacity(messages.len() + 1);
    conversation.push(ChatMessage::system(system_prompt));
    conversation.extend(messages.iter().cloned());
    conversation
}
