//! Input line reading and parsing.

use std::future::Future;

use tokio::io::{AsyncBufRead, Lines};

/// What the user asked for on one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a chat message.
    Say(String),
    /// Switch (`Some`) or clear (`None`) the conversation subject.
    Subject(Option<String>),
    /// Print the conversation so far.
    History,
    /// Print the command list.
    Help,
    /// Leave.
    Quit,
    /// Blank line.
    Nothing,
    /// A slash command that does not exist.
    Unknown(String),
}

impl Command {
    /// Parse one input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Nothing;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "subject" | "topic" => Self::Subject((!arg.is_empty()).then(|| arg.to_string())),
            "history" => Self::History,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Read the next input line, or `None` at end of input or once `interrupt`
/// resolves. Reading a line is cancel safe, so nothing typed is lost.
///
/// # Errors
///
/// Returns a read error from the input or from waiting on `interrupt`.
pub async fn next_line_or_interrupt<R, F>(
    lines: &mut Lines<R>,
    interrupt: F,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        line = lines.next_line() => line,
        signal = interrupt => signal.map(|()| None),
    }
}

/// Shown for `/help`.
pub const HELP: &str = "\
Commands:
  /subject <name>   switch subject (starts a new conversation)
  /subject          clear the subject
  /history          show the conversation so far
  /quit             leave (or Ctrl-D, or Ctrl-C at the prompt)
Ctrl-C while an answer is arriving stops it.";
