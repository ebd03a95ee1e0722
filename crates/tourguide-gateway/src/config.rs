//! Gateway configuration types.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the development gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8000").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Characters per chunk when streaming an answer.
    #[serde(default = "GatewayConfig::default_chunk_chars")]
    pub stream_chunk_chars: usize,

    /// Pause between streamed chunks in milliseconds.
    #[serde(default = "GatewayConfig::default_chunk_delay")]
    pub stream_chunk_delay_ms: u64,

    /// Response header carrying the session handle.
    #[serde(default = "GatewayConfig::default_session_header")]
    pub session_header: String,

    /// Sessions remembered at once; the oldest is forgotten past this.
    #[serde(default = "GatewayConfig::default_max_sessions")]
    pub max_sessions: usize,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8000".to_string()
    }

    const fn default_max_body() -> usize {
        64 * 1024 // 64 KB
    }

    const fn default_chunk_chars() -> usize {
        8
    }

    const fn default_chunk_delay() -> u64 {
        40
    }

    fn default_session_header() -> String {
        "x-session-id".to_string()
    }

    const fn default_max_sessions() -> usize {
        10_000
    }

    /// Get the inter-chunk delay as a `Duration`.
    #[must_use]
    pub fn stream_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.stream_chunk_delay_ms)
    }

    /// Load overrides from `LISTEN_ADDR`, `CORS_ORIGINS` (comma separated),
    /// `STREAM_CHUNK_CHARS`, `STREAM_CHUNK_DELAY_MS`, `SESSION_HEADER` and
    /// `MAX_SESSIONS`.
    ///
    /// Unparsable numbers keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(chars) = env_number("STREAM_CHUNK_CHARS") {
            config.stream_chunk_chars = chars;
        }
        if let Some(delay) = env_number("STREAM_CHUNK_DELAY_MS") {
            config.stream_chunk_delay_ms = delay;
        }
        if let Ok(header) = std::env::var("SESSION_HEADER") {
            config.session_header = header;
        }
        if let Some(max) = env_number("MAX_SESSIONS") {
            config.max_sessions = max;
        }
        config
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable number");
            None
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            stream_chunk_chars: Self::default_chunk_chars(),
            stream_chunk_delay_ms: Self::default_chunk_delay(),
            session_header: Self::default_session_header(),
            max_sessions: Self::default_max_sessions(),
        }
    }
}
