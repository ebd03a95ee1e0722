//! Chat session orchestration.
//!
//! A [`ChatSession`] owns the conversation (message store and session
//! correlator) and runs one exchange at a time:
//!
//! ```text
//! Idle --send--> Sending --(answer | error)--> Idle
//! ```
//!
//! Every accepted send appends one user turn and ends with exactly one
//! assistant turn, created on the first update and overwritten in place by
//! every later one. Failures become a notice turn tagged with
//! [`SYSTEM_SOURCE`] instead of an error.
//!
//! State sits behind a mutex that is never held across an `.await`. Observers
//! follow progress through [`ChatSession::subscribe`].

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tourguide_core::{
    resolve_language, AgeGroup, Frame, MessageStore, SessionCorrelator, Turn, TurnId, TurnUpsert,
    SYSTEM_SOURCE,
};

use crate::client::AssistantClient;
use crate::config::UserProfile;
use crate::error::{ClientError, Result};
use crate::negotiate::{negotiate, Negotiated};
use crate::stream::{CancelSignal, StreamConsumer};
use crate::types::ChatRequest;

// =============================================================================
// State
// =============================================================================

/// Exchange phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No exchange in flight.
    #[default]
    Idle,
    /// An exchange is in flight; new sends are rejected.
    Sending,
}

/// Why a send was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Another exchange is in flight.
    Busy,
    /// The message was blank.
    EmptyInput,
}

/// Result of [`ChatSession::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The exchange ran; this is the final assistant turn (answer or notice).
    Completed(Turn),
    /// Nothing happened.
    Rejected(RejectReason),
}

/// Progress notifications for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A turn was appended or updated; carries a snapshot.
    TurnUpserted(Turn),
    /// The exchange phase changed.
    PhaseChanged(Phase),
    /// The session handle was set or cleared.
    SessionChanged(Option<String>),
}

#[derive(Debug, Default)]
struct ChatState {
    store: MessageStore,
    session: SessionCorrelator,
    input: String,
    phase: Phase,
}

/// Everything an in-flight exchange captured when it started.
#[derive(Debug)]
struct Exchange {
    request: ChatRequest,
    reply_id: TurnId,
    epoch: u64,
    subject: Option<String>,
}

// =============================================================================
// Chat Session
// =============================================================================

/// One user's conversation with the assistant.
pub struct ChatSession {
    client: AssistantClient,
    profile: UserProfile,
    state: Arc<Mutex<ChatState>>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ChatEvent>>>>,
    cancel: Arc<watch::Sender<bool>>,
}

impl Clone for ChatSession {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            profile: self.profile.clone(),
            state: Arc::clone(&self.state),
            subscribers: Arc::clone(&self.subscribers),
            cancel: Arc::clone(&self.cancel),
        }
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("base_url", &self.client.base_url())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Create a session with an empty profile.
    #[must_use]
    pub fn new(client: AssistantClient) -> Self {
        Self::with_profile(client, UserProfile::default())
    }

    /// Create a session for a specific user profile.
    #[must_use]
    pub fn with_profile(client: AssistantClient, profile: UserProfile) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            client,
            profile,
            state: Arc::new(Mutex::new(ChatState::default())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            cancel: Arc::new(cancel),
        }
    }

    /// Register an observer. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Send `text` and run the exchange to completion.
    ///
    /// Rejected without side effects if another exchange is in flight or the
    /// text is blank. Otherwise a user turn is appended, the input field is
    /// cleared, and the call returns once the assistant turn is final.
    ///
    /// # Errors
    ///
    /// Only if the store refuses an update, which a freshly generated turn ID
    /// rules out in practice. Transport and protocol failures are reported as
    /// a notice turn, not as an error.
    pub async fn send(&self, text: &str) -> Result<SendOutcome> {
        let exchange = match self.begin(text) {
            Ok(exchange) => exchange,
            Err(reason) => {
                tracing::debug!(?reason, "Send rejected");
                return Ok(SendOutcome::Rejected(reason));
            }
        };
        let _guard = PhaseGuard { session: self };

        self.cancel.send_replace(false);
        let cancel = CancelSignal::new(self.cancel.subscribe());

        let turn = match self.exchange(&exchange, cancel).await {
            Ok(turn) => turn,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    timeout = err.is_timeout(),
                    status = ?err.status(),
                    "Chat exchange failed"
                );
                let notice = TurnUpsert::content(err.notice())
                    .with_sources(Some(vec![SYSTEM_SOURCE.to_string()]))
                    .with_timestamp(Utc::now());
                self.upsert(&exchange, notice)?
            }
        };

        Ok(SendOutcome::Completed(turn))
    }

    /// Send whatever is in the input field.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn submit(&self) -> Result<SendOutcome> {
        let text = self.state.lock().input.clone();
        self.send(&text).await
    }

    /// Stop the in-flight exchange.
    ///
    /// Before the reply arrives this fails the exchange as aborted; once a
    /// stream is open it ends the stream early and keeps what arrived.
    pub fn cancel(&self) {
        if self.phase() == Phase::Sending {
            tracing::info!("Cancelling in-flight exchange");
            self.cancel.send_replace(true);
        }
    }

    /// Switch the conversation subject. A real change forgets the session
    /// handle so the next request opens a new backend conversation.
    ///
    /// Returns `true` if the handle was reset.
    pub fn set_subject(&self, subject: Option<String>) -> bool {
        let reset = self.state.lock().session.set_subject(subject);
        if reset {
            tracing::info!(subject = ?self.subject(), "Subject changed, session reset");
            self.emit(ChatEvent::SessionChanged(None));
        }
        reset
    }

    /// Replace the input field.
    pub fn set_input(&self, text: impl Into<String>) {
        self.state.lock().input = text.into();
    }

    /// Current input field.
    #[must_use]
    pub fn input(&self) -> String {
        self.state.lock().input.clone()
    }

    /// Current exchange phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Session handle attached to the next request.
    #[must_use]
    pub fn session_handle(&self) -> Option<String> {
        self.state
            .lock()
            .session
            .handle()
            .map(ToString::to_string)
    }

    /// Active subject.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.state.lock().session.subject().map(ToString::to_string)
    }

    /// Snapshot of the conversation.
    #[must_use]
    pub fn turns(&self) -> Vec<Turn> {
        self.state.lock().store.turns().to_vec()
    }

    /// Snapshot of the most recent assistant turn.
    #[must_use]
    pub fn last_assistant(&self) -> Option<Turn> {
        self.state.lock().store.last_assistant().cloned()
    }

    // -------------------------------------------------------------------------
    // Exchange
    // -------------------------------------------------------------------------

    /// Accept or reject a send. On acceptance the user turn is appended and
    /// the phase moves to `Sending` in the same critical section.
    fn begin(&self, text: &str) -> std::result::Result<Exchange, RejectReason> {
        let (exchange, user_turn) = {
            let mut state = self.state.lock();
            if state.phase == Phase::Sending {
                return Err(RejectReason::Busy);
            }
            let message = text.trim();
            if message.is_empty() {
                return Err(RejectReason::EmptyInput);
            }

            let subject = state.session.subject().map(ToString::to_string);
            let user_turn = state.store.push_user(message, subject.clone()).clone();
            state.input.clear();
            state.phase = Phase::Sending;

            let request = ChatRequest {
                message: message.to_string(),
                language: resolve_language(
                    self.profile.language.as_deref(),
                    self.client.config().language.as_deref(),
                ),
                age_group: AgeGroup::classify(self.profile.level.as_deref()),
                session_id: state.session.handle().map(ToString::to_string),
            };
            let exchange = Exchange {
                request,
                reply_id: TurnId::generate(),
                epoch: state.session.epoch(),
                subject,
            };
            (exchange, user_turn)
        };

        tracing::info!(
            turn_id = %exchange.reply_id,
            language = %exchange.request.language,
            age_group = exchange.request.age_group.as_str(),
            has_session = exchange.request.session_id.is_some(),
            "Sending message"
        );
        self.emit(ChatEvent::TurnUpserted(user_turn));
        self.emit(ChatEvent::PhaseChanged(Phase::Sending));
        Ok(exchange)
    }

    async fn exchange(&self, exchange: &Exchange, mut cancel: CancelSignal) -> Result<Turn> {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::Aborted),
            response = self.client.post_chat(&exchange.request) => response?,
        };

        match negotiate(response, &self.client.config().session_header).await? {
            Negotiated::Structured(reply) => {
                if let Some(handle) = reply.handle.as_deref() {
                    self.apply_handle(exchange.epoch, handle);
                }
                let frame = Frame {
                    text: reply.text,
                    sources: reply.sources,
                }
                .finalize();
                let update = TurnUpsert::content(frame.text)
                    .with_sources(frame.sources)
                    .with_timestamp(reply.created_at.unwrap_or_else(Utc::now));
                self.upsert(exchange, update)
            }
            Negotiated::Stream { handle, response } => {
                if let Some(handle) = handle.as_deref() {
                    self.apply_handle(exchange.epoch, handle);
                }
                let frame = StreamConsumer::new()
                    .drive(response.bytes_stream(), Some(cancel), |frame| {
                        let update = TurnUpsert::content(frame.text.clone())
                            .with_sources(frame.sources.clone());
                        self.upsert(exchange, update).map(drop)
                    })
                    .await?;
                let update = TurnUpsert::content(frame.text)
                    .with_sources(frame.sources)
                    .with_timestamp(Utc::now());
                self.upsert(exchange, update)
            }
        }
    }

    fn upsert(&self, exchange: &Exchange, update: TurnUpsert) -> Result<Turn> {
        let update = update.with_subject(exchange.subject.clone());
        let turn = self
            .state
            .lock()
            .store
            .upsert(exchange.reply_id, update)?
            .clone();
        self.emit(ChatEvent::TurnUpserted(turn.clone()));
        Ok(turn)
    }

    fn apply_handle(&self, epoch: u64, raw: &str) {
        let applied = {
            let mut state = self.state.lock();
            if state.session.apply_for(epoch, raw) {
                state.session.handle().map(ToString::to_string)
            } else {
                None
            }
        };
        if let Some(handle) = applied {
            tracing::debug!(handle = %handle, "Session handle updated");
            self.emit(ChatEvent::SessionChanged(Some(handle)));
        }
    }

    fn emit(&self, event: ChatEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Returns the session to `Idle` when the exchange ends, however it ends.
struct PhaseGuard<'a> {
    session: &'a ChatSession,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.session.state.lock().phase = Phase::Idle;
        self.session.emit(ChatEvent::PhaseChanged(Phase::Idle));
    }
}
