//! Terminal rendering of turn updates.
//!
//! Assistant turns arrive as a series of full snapshots. The printer writes
//! only what was appended since the previous snapshot; when a snapshot is not
//! an extension (a partial citation marker got cut off, or an error notice
//! replaced the text) it starts a fresh line and reprints the whole content.

use tourguide_core::{Turn, TurnId};

/// Tracks what has been written for the turn currently on screen.
#[derive(Debug, Default)]
pub struct Printer {
    current: Option<TurnId>,
    printed: String,
}

impl Printer {
    /// Create a printer with nothing on screen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to write for a new snapshot of an assistant turn.
    pub fn update(&mut self, turn: &Turn) -> String {
        if self.current != Some(turn.id) {
            self.current = Some(turn.id);
            self.printed.clone_from(&turn.content);
            return format!("guide> {}", turn.content);
        }

        let out = match turn.content.strip_prefix(self.printed.as_str()) {
            Some(appended) => appended.to_string(),
            None => format!("\nguide> {}", turn.content),
        };
        self.printed.clone_from(&turn.content);
        out
    }

    /// Text to write once the turn is final: the citation line, if any.
    pub fn finish(&mut self, turn: &Turn) -> String {
        let mut out = self.update(turn);
        out.push('\n');
        if let Some(sources) = turn.sources.as_ref().filter(|_| !turn.is_system_notice()) {
            out.push_str(&format!("  sources: {}\n", sources.join(", ")));
        }
        self.current = None;
        self.printed.clear();
        out
    }
}

/// One line per turn, for `/history`.
#[must_use]
pub fn history_line(turn: &Turn) -> String {
    let who = if turn.is_user() { "you" } else { "guide" };
    let subject = turn
        .subject
        .as_deref()
        .map(|s| format!(" [{s}]"))
        .unwrap_or_default();
    format!(
        "{} {who}{subject}: {}",
        turn.timestamp.format("%H:%M:%S"),
        turn.content
    )
}
