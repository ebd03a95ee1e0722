//! Conversation turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::ids::TurnId;

/// Source entry marking an assistant turn as a system-level notice.
pub const SYSTEM_SOURCE: &str = "시스템";

/// Shown when an exchange completes without any usable answer text.
pub const NO_ANSWER_FALLBACK: &str = "죄송합니다. 답변을 받지 못했습니다.";

/// Shown when a failure has no more specific description.
pub const RETRY_NOTICE: &str = "일시적인 오류가 발생했습니다. 잠시 후 다시 시도해 주세요.";

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Typed by the person using the chat.
    User,
    /// Produced by the assistant service (or a local notice in its place).
    Assistant,
}

impl Role {
    /// Wire/display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in the displayed conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Stable upsert key.
    pub id: TurnId,
    /// Author.
    pub role: Role,
    /// Full current text. Replaced wholesale on every update.
    pub content: String,
    /// Creation time, unless an update supplied a later one.
    pub timestamp: DateTime<Utc>,
    /// Citations, present once at least one non-empty entry was parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    /// Subject that was active when the turn was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Turn {
    /// Create a user turn stamped with the current time.
    #[must_use]
    pub fn user(content: impl Into<String>, subject: Option<String>) -> Self {
        Self {
            id: TurnId::generate(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            sources: None,
            subject,
        }
    }

    /// Check if this is a user turn.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Check if this turn is a locally generated failure notice.
    #[must_use]
    pub fn is_system_notice(&self) -> bool {
        matches!(self.sources.as_deref(), Some([only]) if only == SYSTEM_SOURCE)
    }
}

/// Parse an RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Returns `CoreError::InvalidTimestamp` if the text is not RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::InvalidTimestamp(format!("{raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_turn_creation() {
        let turn = Turn::user("경복궁 입장료?", Some("Seoul".to_string()));
        assert!(turn.is_user());
        assert_eq!(turn.content, "경복궁 입장료?");
        assert_eq!(turn.subject.as_deref(), Some("Seoul"));
        assert!(turn.sources.is_none());
    }

    #[test]
    fn system_notice_detection() {
        let mut turn = Turn::user("x", None);
        turn.role = Role::Assistant;
        turn.sources = Some(vec![SYSTEM_SOURCE.to_string()]);
        assert!(turn.is_system_notice());

        turn.sources = Some(vec![SYSTEM_SOURCE.to_string(), "other".to_string()]);
        assert!(!turn.is_system_notice());
    }

    #[test]
    fn role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn timestamp_parsing() {
        let ts = parse_timestamp("2024-05-01T09:30:00+09:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T00:30:00+00:00");

        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimestamp(_)));
    }
}
