//! Core types for the tourguide assistant chat.
//!
//! This crate holds the I/O-free half of the assistant response pipeline:
//!
//! - **Framing**: the plain-text wire format of a streamed answer and its
//!   citation trailer
//! - **Turns and the message store**: create-or-update by stable turn ID
//! - **Session correlation**: the backend conversation handle and the subject
//!   that scopes it
//! - **Audience**: the coarse adult/child classifier sent with each request
//!
//! # Example
//!
//! ```
//! use tourguide_core::framing;
//! use tourguide_core::{MessageStore, TurnId, TurnUpsert};
//!
//! let mut store = MessageStore::new();
//! let id = TurnId::generate();
//!
//! let mut buffer = String::new();
//! for chunk in ["Namsan Tower is open ", "until 11pm.\n[SOU", "RCES]Visit Seoul"] {
//!     buffer.push_str(chunk);
//!     let frame = framing::parse(&buffer);
//!     store
//!         .upsert(id, TurnUpsert::content(frame.text).with_sources(frame.sources))
//!         .unwrap();
//! }
//!
//! let turn = store.get(&id).unwrap();
//! assert_eq!(turn.content, "Namsan Tower is open until 11pm.");
//! assert_eq!(turn.sources.as_deref(), Some(&["Visit Seoul".to_string()][..]));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audience;
pub mod error;
pub mod framing;
pub mod ids;
pub mod session;
pub mod store;
pub mod turn;

pub use audience::{resolve_language, AgeGroup, DEFAULT_LANGUAGE};
pub use error::{CoreError, Result};
pub use framing::{Frame, SOURCES_MARKER};
pub use ids::{IdError, SessionHandle, TurnId};
pub use session::SessionCorrelator;
pub use store::{MessageStore, TurnUpsert};
pub use turn::{Role, Turn, NO_ANSWER_FALLBACK, RETRY_NOTICE, SYSTEM_SOURCE};
