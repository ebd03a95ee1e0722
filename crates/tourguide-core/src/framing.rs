//! Plain-text wire framing for streamed answers.
//!
//! A streamed answer is display text, optionally followed by [`SOURCES_MARKER`]
//! and a `|`-separated citation trailer:
//!
//! ```text
//! Gyeongbokgung opens at 9am.\n[SOURCES]Visit Seoul|Cultural Heritage Administration
//! ```
//!
//! [`parse`] always works on the whole accumulated buffer, so it gives the same
//! answer no matter where the transport split the bytes, including splits that
//! land inside the marker itself.
//!
//! There is no escaping: a source name containing `|`, or display text that
//! contains the marker literally, does not survive a round trip.

use crate::turn::NO_ANSWER_FALLBACK;

/// Delimiter between display text and the citation trailer.
pub const SOURCES_MARKER: &str = "\n[SOURCES]";

/// Separator between citation entries in the trailer.
pub const SOURCE_SEPARATOR: char = '|';

/// Decoded view of a framed buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Display text (everything before the marker).
    pub text: String,
    /// Citation list; `None` when there is no trailer or it has no usable entries.
    pub sources: Option<Vec<String>>,
}

impl Frame {
    /// Whether a trailer with at least one usable entry was parsed.
    #[must_use]
    pub fn has_sources(&self) -> bool {
        self.sources.is_some()
    }

    /// Apply end-of-stream rules: trim trailing whitespace and substitute the
    /// fallback answer if nothing usable is left.
    #[must_use]
    pub fn finalize(self) -> Self {
        let trimmed = self.text.trim_end();
        let text = if trimmed.trim_start().is_empty() {
            NO_ANSWER_FALLBACK.to_string()
        } else {
            trimmed.to_string()
        };
        Self {
            text,
            sources: self.sources,
        }
    }
}

/// Parse a (possibly partial) framed buffer.
///
/// Splits on the first occurrence of [`SOURCES_MARKER`]. Idempotent and
/// stateless, so callers re-run it on the full buffer after every chunk.
#[must_use]
pub fn parse(buffer: &str) -> Frame {
    match buffer.split_once(SOURCES_MARKER) {
        None => Frame {
            text: buffer.to_string(),
            sources: None,
        },
        Some((text, trailer)) => Frame {
            text: text.to_string(),
            sources: normalize_sources(trailer.split(SOURCE_SEPARATOR)),
        },
    }
}

/// Encode text and sources into the wire format.
///
/// The marker is only written when `sources` is non-empty.
#[must_use]
pub fn frame<S: AsRef<str>>(text: &str, sources: &[S]) -> String {
    if sources.is_empty() {
        return text.to_string();
    }

    let trailer = sources
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&SOURCE_SEPARATOR.to_string());

    let mut out = String::with_capacity(text.len() + SOURCES_MARKER.len() + trailer.len());
    out.push_str(text);
    out.push_str(SOURCES_MARKER);
    out.push_str(&trailer);
    out
}

/// Trim entries, drop blanks and duplicates (first occurrence wins).
///
/// Returns `None` instead of an empty list.
pub fn normalize_sources<I, S>(entries: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.as_ref().trim();
        if entry.is_empty() || out.iter().any(|seen| seen == entry) {
            continue;
        }
        out.push(entry.to_string());
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
