//! `POST /api/chat`: validate, shape, forward, unwrap.

use std::time::Instant;

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::http::response::RelayError;
use crate::http::server::AppState;
use crate::relay::{build_conversation, select_model, validate_request, ChatReply, ChatRequest};

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, RelayError> {
    let Json(request) = payload?;

    // One snapshot per request so a reload mid-flight cannot mix settings.
    let config = state.config.load_full();

    validate_request(&request, &config.limits)?;
    let model = select_model(request.model.as_deref(), &config.upstream)?;
    let conversation = build_conversation(&config.prompt.system_prompt, &request.messages);

    let start = Instant::now();
    let completion = state
        .upstream
        .complete(&config.upstream, &model, &conversation)
        .await?;

    tracing::info!(
        model = %completion.model,
        messages = request.messages.len(),
        upstream_ms = start.elapsed().as_millis() as u64,
        prompt_tokens = completion.usage.map(|u| u.prompt_tokens),
        completion_tokens = completion.usage.map(|u| u.completion_tokens),
        finish_reason = completion.finish_reason.as_deref().unwrap_or("unknown"),
        "Completion relayed"
    );

    Ok(Json(ChatReply {
        reply: completion.reply,
        model: completion.model,
    }))
}
