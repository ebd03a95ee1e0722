//! Development assistant server for the tourguide chat protocol.
//!
//! Speaks the same protocol as the production assistant service:
//!
//! - `POST /chat` answers with one JSON object when the client's `Accept`
//!   header lists `application/json` first, and otherwise streams the framed
//!   answer (`text\n[SOURCES]a|b`) in small chunks
//! - the session handle travels back in a response header in both modes, and
//!   in the JSON body as `session_id`
//! - errors are `{"detail": "..."}` with a matching status
//!
//! Answers come from a [`Responder`]; [`GuideResponder`] is a canned catalog.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tourguide_gateway::{serve, GatewayConfig, GatewayState, GuideResponder};
//!
//! # async fn example() -> std::io::Result<()> {
//! let config = GatewayConfig::default();
//! let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
//! let state = GatewayState::new(Arc::new(GuideResponder::new()), config);
//! serve(listener, state).await
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod responder;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use responder::{GuideAnswer, GuideQuery, GuideResponder, Responder};
pub use routes::create_router;
pub use state::GatewayState;

/// Serve the gateway on an already bound listener until the task is dropped.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve<R>(listener: tokio::net::TcpListener, state: GatewayState<R>) -> std::io::Result<()>
where
    R: Responder + 'static,
{
    axum::serve(listener, create_router(state)).await
}
