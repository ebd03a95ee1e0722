//! Chat endpoint.
//!
//! `POST /chat` answers in one of two modes:
//!
//! - `Accept: application/json` first: one JSON object with the whole answer.
//! - anything else: the framed answer as `text/plain`, written in small
//!   chunks with a pause between them.
//!
//! Both modes carry the session handle in the configured response header.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tourguide_core::{framing, resolve_language, AgeGroup};

use crate::error::ApiError;
use crate::responder::{GuideAnswer, GuideQuery, Responder};
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    /// User message.
    pub message: String,
    /// Answer language code.
    #[serde(default)]
    pub language: Option<String>,
    /// Audience.
    #[serde(default)]
    pub age_group: AgeGroup,
    /// Existing conversation handle.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Structured chat response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Answer text.
    pub assistant_response: String,
    /// Citation names.
    pub sources: Vec<String>,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Conversation handle.
    pub session_id: String,
}

const JSON_MEDIA_TYPE: &str = "application/json";
const STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

// =============================================================================
// Handler
// =============================================================================

/// Answer one chat message.
///
/// # Errors
///
/// - the JSON extractor's status if the body is not a valid chat request
/// - `422` if the message is blank
/// - `400` if the session handle cannot be echoed in a header
/// - whatever the responder returns if it fails
pub async fn chat<R: Responder + 'static>(
    State(state): State<Arc<GatewayState<R>>>,
    headers: HeaderMap,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ApiError::Unprocessable(
            "message must not be empty".to_string(),
        ));
    }

    let header_name = HeaderName::from_bytes(state.config.session_header.as_bytes())
        .map_err(|e| ApiError::Internal(format!("invalid session header name: {e}")))?;
    if let Some(requested) = body.session_id.as_deref() {
        HeaderValue::from_str(requested.trim()).map_err(|_| {
            ApiError::BadRequest("session_id contains invalid characters".to_string())
        })?;
    }

    let (session_id, turn) = state.record_turn(body.session_id.as_deref());
    let header_value = HeaderValue::from_str(&session_id)
        .map_err(|e| ApiError::Internal(format!("unencodable session id: {e}")))?;

    let query = GuideQuery {
        message: message.to_string(),
        language: resolve_language(body.language.as_deref(), None),
        age_group: body.age_group,
        session_id,
        turn,
    };
    let answer = state.responder.respond(&query).await?;

    let json = prefers_json(&headers);
    tracing::info!(
        session = %query.session_id,
        turn,
        language = %query.language,
        age_group = query.age_group.as_str(),
        json,
        "Answering chat message"
    );

    if json {
        let body = ChatResponse {
            assistant_response: answer.text,
            sources: answer.sources,
            created_at: Utc::now().to_rfc3339(),
            session_id: query.session_id,
        };
        return Ok((StatusCode::OK, [(header_name, header_value)], Json(body)).into_response());
    }

    stream_answer(&state, &answer, header_name, header_value)
}

fn stream_answer<R: Responder>(
    state: &GatewayState<R>,
    answer: &GuideAnswer,
    header_name: HeaderName,
    header_value: HeaderValue,
) -> Result<Response, ApiError> {
    let wire = framing::frame(&answer.text, &answer.sources);
    let chunks = split_chars(&wire, state.config.stream_chunk_chars.max(1));
    let delay = state.config.stream_chunk_delay();

    tracing::debug!(
        chunks = chunks.len(),
        bytes = wire.len(),
        "Streaming framed answer"
    );

    let stream = futures::stream::iter(chunks).then(move |chunk| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, Infallible>(chunk)
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, STREAM_CONTENT_TYPE)
        .header(header_name, header_value)
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Whether the first media type in `Accept` is JSON.
fn prefers_json(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .and_then(|accept| accept.split(',').next())
        .and_then(|first| first.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
}

/// Split on character boundaries into pieces of at most `size` characters.
fn split_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|piece| piece.iter().collect()).collect()
}
