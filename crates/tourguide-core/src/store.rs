//! Append-ordered message store with create-or-update by turn ID.
//!
//! One logical assistant turn is rendered many times while it streams in; every
//! rendering goes through [`MessageStore::upsert`] with the same [`TurnId`], so
//! the store never gains duplicate entries and a turn never changes position.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{CoreError, Result};
use crate::ids::TurnId;
use crate::turn::{Role, Turn};

/// Field values carried by one upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnUpsert {
    /// Full replacement content.
    pub content: String,
    /// New citations. `None` leaves existing citations untouched.
    pub sources: Option<Vec<String>>,
    /// New timestamp. `None` keeps the existing one (or "now" on creation).
    pub timestamp: Option<DateTime<Utc>>,
    /// Subject tag, only consulted when the turn is created.
    pub subject: Option<String>,
}

impl TurnUpsert {
    /// An upsert that only replaces content.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Attach citations.
    #[must_use]
    pub fn with_sources(mut self, sources: Option<Vec<String>>) -> Self {
        self.sources = sources;
        self
    }

    /// Attach an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach the subject to tag a newly created turn with.
    #[must_use]
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }
}

/// Ordered collection of turns.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    turns: Vec<Turn>,
    index: HashMap<TurnId, usize>,
}

impl MessageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn. User turns are never modified afterwards.
    pub fn push_user(&mut self, content: impl Into<String>, subject: Option<String>) -> &Turn {
        self.append(Turn::user(content, subject))
    }

    /// Create the assistant turn `id` if absent, otherwise update it in place.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ImmutableTurn` if `id` belongs to a user turn.
    pub fn upsert(&mut self, id: TurnId, update: TurnUpsert) -> Result<&Turn> {
        let Some(&idx) = self.index.get(&id) else {
            let turn = Turn {
                id,
                role: Role::Assistant,
                content: update.content,
                timestamp: update.timestamp.unwrap_or_else(Utc::now),
                sources: update.sources,
                subject: update.subject,
            };
            return Ok(self.append(turn));
        };

        let turn = &mut self.turns[idx];
        if turn.is_user() {
            return Err(CoreError::ImmutableTurn(id));
        }

        turn.content = update.content;
        if let Some(sources) = update.sources {
            turn.sources = Some(sources);
        }
        if let Some(timestamp) = update.timestamp {
            turn.timestamp = timestamp;
        }
        Ok(turn)
    }

    /// Look up a turn by ID.
    #[must_use]
    pub fn get(&self, id: &TurnId) -> Option<&Turn> {
        self.index.get(id).map(|&idx| &self.turns[idx])
    }

    /// All turns in creation order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Iterate turns in creation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Most recent assistant turn.
    #[must_use]
    pub fn last_assistant(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.role == Role::Assistant)
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the store has no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn append(&mut self, turn: Turn) -> &Turn {
        let idx = self.turns.len();
        self.index.insert(turn.id, idx);
        self.turns.push(turn);
        &self.turns[idx]
    }
}

impl<'a> IntoIterator for &'a MessageStore {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
