//! Common error types for tourguide.
//!
//! This module provides shared error types that are used across multiple crates.

use crate::ids::TurnId;
use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur in the conversation model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An update targeted a user turn, which is immutable once created.
    #[error("turn {0} is a user turn and cannot be updated")]
    ImmutableTurn(TurnId),

    /// A timestamp could not be parsed as RFC 3339.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
