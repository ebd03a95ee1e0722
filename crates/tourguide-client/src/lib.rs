//! Client side of the tourguide assistant chat.
//!
//! This crate delivers assistant answers into a conversation:
//!
//! - **Client**: posts chat requests to the assistant service
//! - **Negotiation**: decides between a single JSON answer and a framed stream
//! - **Streaming**: decodes chunks and re-parses the growing buffer
//! - **Chat sessions**: the send state machine, session continuity, and
//!   failure notices
//!
//! # Example
//!
//! ```no_run
//! use tourguide_client::{AssistantClient, ChatSession, ClientConfig, SendOutcome};
//!
//! # async fn example() -> tourguide_client::Result<()> {
//! let client = AssistantClient::new(ClientConfig::with_base_url("http://localhost:8000"))?;
//! let chat = ChatSession::new(client);
//!
//! if let SendOutcome::Completed(turn) = chat.send("경복궁 관람 시간 알려줘").await? {
//!     println!("{}", turn.content);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod negotiate;
pub mod stream;
pub mod types;

pub use chat::{ChatEvent, ChatSession, Phase, RejectReason, SendOutcome};
pub use client::AssistantClient;
pub use config::{ClientConfig, UserProfile};
pub use error::{ClientError, Result};
pub use negotiate::{negotiate, Negotiated, ResponseMode};
pub use stream::{CancelSignal, StreamConsumer, Utf8ChunkDecoder};
pub use types::{ChatRequest, StructuredReply, StructuredResponse};
