//! Wire types for the assistant chat endpoint.
//!
//! These types mirror the request and response bodies of the assistant service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tourguide_core::{framing, turn, AgeGroup};

// =============================================================================
// Request
// =============================================================================

/// Outgoing chat request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message text.
    pub message: String,
    /// Answer language code.
    pub language: String,
    /// Audience classifier.
    pub age_group: AgeGroup,
    /// Backend conversation handle, once one has been issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

// =============================================================================
// Structured Response
// =============================================================================

/// Single-object answer body.
///
/// Two spellings exist for the answer and for the session handle; the first
/// present one of each pair wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredResponse {
    /// Answer text (preferred field).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_response: Option<String>,
    /// Answer text (alternate field).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Citation list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    /// Creation time (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Session handle (preferred field).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Session handle (alternate field).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// A decoded structured answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredReply {
    /// Answer text, empty if the payload had none.
    pub text: String,
    /// Normalized citations.
    pub sources: Option<Vec<String>>,
    /// Parsed creation time, if present and valid.
    pub created_at: Option<DateTime<Utc>>,
    /// Session handle from the payload.
    pub handle: Option<String>,
}

impl StructuredResponse {
    /// Resolve alternate fields and normalize the payload.
    #[must_use]
    pub fn into_reply(self) -> StructuredReply {
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|raw| match turn::parse_timestamp(raw) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unparsable created_at");
                    None
                }
            });

        StructuredReply {
            text: self
                .assistant_response
                .or(self.response)
                .unwrap_or_default(),
            sources: self.sources.and_then(framing::normalize_sources),
            created_at,
            handle: self.session_id.or(self.conversation_id),
        }
    }
}

// =============================================================================
// Error Response
// =============================================================================

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Human-readable description. Validation failures may send a list here.
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    /// The detail text, if it is a non-blank string.
    #[must_use]
    pub fn detail_text(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|detail| !detail.is_empty())
    }
}
