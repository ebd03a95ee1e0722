//! Session correlation across exchanges.
//!
//! The backend groups exchanges into one conversation by a handle it issues.
//! The correlator holds that handle, hands it to every outgoing request, and
//! forgets it when the conversation subject changes.
//!
//! Every reset bumps an epoch. Exchanges capture the epoch when they start and
//! pass it back with [`SessionCorrelator::apply_for`], so a handle that arrives
//! after a subject switch cannot revive the previous conversation.

use crate::ids::SessionHandle;

/// Holds the active subject and backend session handle.
#[derive(Debug, Clone, Default)]
pub struct SessionCorrelator {
    handle: Option<SessionHandle>,
    subject: Option<String>,
    epoch: u64,
}

impl SessionCorrelator {
    /// Create an empty correlator with no subject.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a correlator scoped to an initial subject.
    #[must_use]
    pub fn with_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: normalize_subject(Some(subject.into())),
            ..Self::default()
        }
    }

    /// Store `raw` as the current handle if it is non-blank.
    ///
    /// Returns `true` if the stored handle changed.
    pub fn apply(&mut self, raw: &str) -> bool {
        let Some(handle) = SessionHandle::parse(raw) else {
            return false;
        };
        if self.handle.as_ref() == Some(&handle) {
            return false;
        }
        self.handle = Some(handle);
        true
    }

    /// Like [`apply`](Self::apply), but ignored if a reset happened after
    /// `epoch` was captured.
    pub fn apply_for(&mut self, epoch: u64, raw: &str) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.apply(raw)
    }

    /// Forget the handle so the next request starts a new conversation.
    pub fn reset(&mut self) {
        self.handle = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Switch subject. Resets the handle if the subject actually changed.
    ///
    /// Returns `true` if a reset happened.
    pub fn set_subject(&mut self, subject: Option<String>) -> bool {
        let subject = normalize_subject(subject);
        if subject == self.subject {
            return false;
        }
        self.subject = subject;
        self.reset();
        true
    }

    /// Handle to attach to the next request.
    #[must_use]
    pub fn handle(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }

    /// Active subject.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Current reset epoch.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }
}

fn normalize_subject(subject: Option<String>) -> Option<String> {
    subject
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
