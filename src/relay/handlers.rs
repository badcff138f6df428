//! The two relay endpoints
//!
//! Both follow the same shape: validate the request body without touching
//! the upstream, initiate the streaming call, then hand the fragment
//! stream to the relay. Initiation failures become JSON error responses;
//! anything after the 200 is the relay's problem.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use super::chat::{self, ConversationTurn};
use super::error::RelayError;
use super::server::RelayState;
use super::streaming::streamed_response;
use crate::prompt::build_summary_prompt;

/// POST /api/summary: stream a 3-4 sentence summary of an article excerpt.
pub async fn summary(State(state): State<RelayState>, body: Bytes) -> Response {
    let context = match parse_summary_request(&body) {
        Ok(context) => context,
        Err(e) => return e.into_response(),
    };

    let prompt = build_summary_prompt(&context);
    tracing::debug!(context_len = context.len(), "Initiating summary generation");

    match state.backend.stream_generate(&prompt).await {
        Ok(fragments) => streamed_response(fragments),
        // No caller-supplied history is involved here, so initiation
        // failures are always server-side, never reclassified.
        Err(e) => RelayError::Upstream(e).into_response(),
    }
}

/// POST /api/chat: continue a conversation, streaming the reply.
pub async fn chat(State(state): State<RelayState>, body: Bytes) -> Response {
    let history = match parse_chat_request(&body) {
        Ok(history) => history,
        Err(e) => return e.into_response(),
    };

    let (prior, message) = match chat::prepare(history) {
        Ok(prepared) => prepared,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(prior_turns = prior.len(), "Initiating chat generation");

    match state.backend.stream_chat(prior, &message).await {
        Ok(fragments) => streamed_response(fragments),
        Err(e) => RelayError::from_upstream(e).into_response(),
    }
}

/// Extract a non-empty `context` string from the request body.
fn parse_summary_request(body: &[u8]) -> Result<String, RelayError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| RelayError::Validation("request body must be JSON".to_string()))?;

    match value.get("context").and_then(|c| c.as_str()) {
        Some(context) if !context.is_empty() => Ok(context.to_string()),
        _ => Err(RelayError::Validation(
            "article context is required".to_string(),
        )),
    }
}

/// Extract a non-empty `history` array from the request body.
fn parse_chat_request(body: &[u8]) -> Result<Vec<ConversationTurn>, RelayError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| RelayError::Validation("request body must be JSON".to_string()))?;

    let Some(history) = value.get("history") else {
        return Err(RelayError::Validation(
            "chat history is required".to_string(),
        ));
    };

    if !history.is_array() {
        return Err(RelayError::Validation(
            "chat history must be an array of turns".to_string(),
        ));
    }

    let turns: Vec<ConversationTurn> = serde_json::from_value(history.clone())
        .map_err(|e| RelayError::Validation(format!("malformed chat history: {}", e)))?;

    if turns.is_empty() {
        return Err(RelayError::Validation(
            "chat history must not be empty".to_string(),
        ));
    }

    Ok(turns)
}
