//! Client configuration types.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for talking to the assistant service.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the assistant service (e.g., "http://localhost:8000").
    #[serde(default = "ClientConfig::default_base_url")]
    pub base_url: String,

    /// Path of the chat endpoint.
    #[serde(default = "ClientConfig::default_chat_path")]
    pub chat_path: String,

    /// Whole-request deadline in seconds, including reading a streamed body.
    #[serde(default = "ClientConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Response header that may carry the session handle on streamed replies.
    #[serde(default = "ClientConfig::default_session_header")]
    pub session_header: String,

    /// Language used when the user profile does not set one.
    #[serde(default)]
    pub language: Option<String>,

    /// Ask for a streamed answer instead of a single JSON object.
    #[serde(default = "ClientConfig::default_prefer_stream")]
    pub prefer_stream: bool,
}

impl ClientConfig {
    fn default_base_url() -> String {
        "http://localhost:8000".to_string()
    }

    fn default_chat_path() -> String {
        "/chat".to_string()
    }

    const fn default_request_timeout() -> u64 {
        60
    }

    fn default_session_header() -> String {
        "x-session-id".to_string()
    }

    const fn default_prefer_stream() -> bool {
        true
    }

    /// Config pointing at `base_url` with every other field defaulted.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Full URL of the chat endpoint.
    #[must_use]
    pub fn chat_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.chat_path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            chat_path: Self::default_chat_path(),
            request_timeout_seconds: Self::default_request_timeout(),
            session_header: Self::default_session_header(),
            language: None,
            prefer_stream: Self::default_prefer_stream(),
        }
    }
}

/// Per-user settings sent with each request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    /// Preferred answer language code.
    #[serde(default)]
    pub language: Option<String>,
    /// Free-text level used to pick the audience (e.g., "초등학생", "adult").
    #[serde(default)]
    pub level: Option<String>,
}
