//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::responder::Responder;

/// Shared application state for the gateway.
pub struct GatewayState<R>
where
    R: Responder,
{
    /// Produces answers.
    pub responder: Arc<R>,
    /// Questions answered so far, per session handle.
    sessions: Arc<Mutex<SessionBook>>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<R> GatewayState<R>
where
    R: Responder,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(responder: Arc<R>, config: GatewayConfig) -> Self {
        Self {
            responder,
            sessions: Arc::new(Mutex::new(SessionBook::default())),
            config,
        }
    }

    /// Count one more question in `requested`, or in a fresh session when
    /// the request carries no usable handle.
    ///
    /// Returns the handle and the 1-based turn number.
    pub fn record_turn(&self, requested: Option<&str>) -> (String, u32) {
        let session_id = requested
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);

        let turn = self
            .sessions
            .lock()
            .bump(&session_id, self.config.max_sessions.max(1));
        (session_id, turn)
    }

    /// Questions answered in `session_id`, if it is known.
    #[must_use]
    pub fn session_turns(&self, session_id: &str) -> Option<u32> {
        self.sessions.lock().turns.get(session_id).copied()
    }

    /// Number of known sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().turns.len()
    }
}

impl<R> Clone for GatewayState<R>
where
    R: Responder,
{
    fn clone(&self) -> Self {
        Self {
            responder: Arc::clone(&self.responder),
            sessions: Arc::clone(&self.sessions),
            config: self.config.clone(),
        }
    }
}

/// Turn counters plus creation order, bounded by `max_sessions`.
#[derive(Debug, Default)]
struct SessionBook {
    turns: HashMap<String, u32>,
    order: VecDeque<String>,
}

impl SessionBook {
    fn bump(&mut self, session_id: &str, capacity: usize) -> u32 {
        if let Some(turn) = self.turns.get_mut(session_id) {
            *turn += 1;
            return *turn;
        }

        while self.turns.len() >= capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.turns.remove(&oldest);
            tracing::debug!(session = %oldest, "Forgot oldest session");
        }
        self.turns.insert(session_id.to_string(), 1);
        self.order.push_back(session_id.to_string());
        1
    }
}
