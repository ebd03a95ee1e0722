//! Client error types.
//!
//! Failures fall in two groups. Transport faults (`Timeout`, `Aborted`,
//! `Transport`) mean no usable reply arrived. Protocol faults (`Status`,
//! `Malformed`) mean the service answered with something other than an answer.
//! Either way the exchange ends and the user gets a visible notice built from
//! [`ClientError::notice`].

use thiserror::Error;
use tourguide_core::{CoreError, RETRY_NOTICE};

/// A result type using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request deadline expired before the reply completed.
    #[error("request timed out")]
    Timeout,

    /// The exchange was abandoned before a reply arrived.
    #[error("request aborted")]
    Aborted,

    /// Network-level failure.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Decoded `detail`, or a generic description of the status.
        detail: String,
    },

    /// The reply could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The conversation model rejected an update.
    #[error("store error: {0}")]
    Store(#[from] CoreError),
}

impl ClientError {
    /// Whether this failure was a deadline expiry.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// HTTP status, for `Status` errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text shown to the user in the failure notice.
    #[must_use]
    pub fn notice(&self) -> String {
        let description = match self {
            Self::Status { detail, .. } => detail.trim().to_string(),
            Self::Malformed(_) => self.to_string(),
            Self::Timeout | Self::Aborted | Self::Transport(_) | Self::Store(_) => String::new(),
        };
        if description.is_empty() {
            RETRY_NOTICE.to_string()
        } else {
            description
        }
    }
}

/// Every reqwest failure is a transport fault, including a body that breaks
/// off mid-read (which reqwest reports as a decode error). Payload decoding
/// is done with `serde_json` and reported as `Malformed` there.
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}
