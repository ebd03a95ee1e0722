//! Tourguide Gateway - development assistant server
//!
//! Configuration comes from the environment; see [`GatewayConfig::from_env`].

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tourguide_gateway::{serve, GatewayConfig, GatewayState, GuideResponder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tourguide=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tourguide Gateway");

    let config = GatewayConfig::from_env();
    tracing::info!(
        listen_addr = %config.listen_addr,
        cors_origins = ?config.cors_origins,
        stream_chunk_chars = config.stream_chunk_chars,
        stream_chunk_delay_ms = config.stream_chunk_delay_ms,
        session_header = %config.session_header,
        max_sessions = config.max_sessions,
        "Gateway configuration loaded"
    );

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    let state = GatewayState::new(Arc::new(GuideResponder::new()), config);

    tracing::info!(addr = %listener.local_addr()?, "Starting HTTP server");
    serve(listener, state).await?;

    Ok(())
}
