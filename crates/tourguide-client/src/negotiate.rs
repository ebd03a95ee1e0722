//! Transport negotiation.
//!
//! The chat endpoint answers in one of two modes, chosen by the server and
//! declared through `Content-Type`:
//!
//! - `application/json`: one [`StructuredResponse`] object, a complete answer.
//! - anything else: an open byte stream in the framing wire format, consumed
//!   by [`crate::stream`].
//!
//! Non-success statuses short-circuit both modes and become
//! [`ClientError::Status`].

use reqwest::header::CONTENT_TYPE;
use reqwest::Response;

use crate::error::{ClientError, Result};
use crate::types::{ApiErrorResponse, StructuredReply, StructuredResponse};

/// Content type of a single structured answer.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type the client asks for when it prefers streaming.
pub const STREAM_CONTENT_TYPE: &str = "text/plain";

/// How a successful response body must be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// One JSON object.
    Structured,
    /// Framed text stream.
    Stream,
}

impl ResponseMode {
    /// Classify a `Content-Type` header value. Parameters are ignored.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .unwrap_or_default();

        if essence.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
            Self::Structured
        } else {
            Self::Stream
        }
    }
}

/// A successful response, ready for consumption.
#[derive(Debug)]
pub enum Negotiated {
    /// Complete answer decoded from JSON.
    Structured(StructuredReply),
    /// Open stream; `handle` comes from the session header, read up front.
    Stream {
        /// Session handle from the response header.
        handle: Option<String>,
        /// Response whose body has not been read yet.
        response: Response,
    },
}

/// Inspect a response and decide how to consume it.
///
/// # Errors
///
/// Returns `ClientError::Status` for non-success statuses and
/// `ClientError::Malformed` if a structured body is not valid JSON.
pub async fn negotiate(response: Response, session_header: &str) -> Result<Negotiated> {
    let status = response.status();
    if !status.is_success() {
        let body = response.bytes().await.unwrap_or_default();
        return Err(status_error(status.as_u16(), &body));
    }

    let header_handle = response
        .headers()
        .get(session_header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string);

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    match ResponseMode::from_content_type(content_type) {
        ResponseMode::Structured => {
            let body = response.bytes().await?;
            let mut reply = decode_structured(&body)?;
            if reply.handle.is_none() {
                reply.handle = header_handle;
            }
            tracing::debug!(
                bytes = body.len(),
                has_sources = reply.sources.is_some(),
                "Negotiated structured response"
            );
            Ok(Negotiated::Structured(reply))
        }
        ResponseMode::Stream => {
            tracing::debug!(
                content_type = content_type.unwrap_or(""),
                has_handle = header_handle.is_some(),
                "Negotiated streaming response"
            );
            Ok(Negotiated::Stream {
                handle: header_handle,
                response,
            })
        }
    }
}

/// Decode a structured answer body.
///
/// # Errors
///
/// Returns `ClientError::Malformed` if the body is not a JSON object of the
/// expected shape.
pub fn decode_structured(body: &[u8]) -> Result<StructuredReply> {
    serde_json::from_slice::<StructuredResponse>(body)
        .map(StructuredResponse::into_reply)
        .map_err(|e| ClientError::Malformed(e.to_string()))
}

/// Build the error for a non-success status from its (possibly empty) body.
#[must_use]
pub fn status_error(status: u16, body: &[u8]) -> ClientError {
    let detail = serde_json::from_slice::<ApiErrorResponse>(body)
        .ok()
        .and_then(|err| err.detail_text().map(ToString::to_string))
        .unwrap_or_else(|| format!("request failed: {status}"));

    ClientError::Status { status, detail }
}
