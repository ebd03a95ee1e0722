//! Coarse audience classification from a free-text profile level.

use serde::{Deserialize, Serialize};

/// Language used when neither the profile nor the configuration sets one.
pub const DEFAULT_LANGUAGE: &str = "ko";

const CHILD_KEYWORDS: &[&str] = &[
    "child", "children", "kid", "kids", "junior", "elementary", "어린이", "아동", "유아", "초등",
];

/// Audience the backend tailors its answer for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    /// General audience.
    #[default]
    Adult,
    /// Simplified answers for young travellers.
    Child,
}

impl AgeGroup {
    /// Classify a free-text profile level.
    ///
    /// Anything mentioning a child-like keyword maps to `Child`; everything
    /// else, including a missing level, maps to `Adult`.
    #[must_use]
    pub fn classify(level: Option<&str>) -> Self {
        let Some(level) = level.map(|l| l.trim().to_lowercase()) else {
            return Self::Adult;
        };
        if CHILD_KEYWORDS
            .iter()
            .any(|keyword| level == *keyword || level.contains(keyword))
        {
            Self::Child
        } else {
            Self::Adult
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Adult => "adult",
            Self::Child => "child",
        }
    }
}

/// Pick the first non-blank language, falling back to [`DEFAULT_LANGUAGE`].
#[must_use]
pub fn resolve_language(preferred: Option<&str>, configured: Option<&str>) -> String {
    [preferred, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|lang| !lang.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string()
}
