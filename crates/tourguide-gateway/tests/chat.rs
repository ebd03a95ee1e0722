//! Router-level tests for both response modes and the error contract.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tourguide_core::framing;
use tourguide_gateway::{
    create_router, ApiError, GatewayConfig, GatewayState, GuideAnswer, GuideQuery,
    GuideResponder, Responder,
};

fn config() -> GatewayConfig {
    GatewayConfig {
        stream_chunk_chars: 5,
        stream_chunk_delay_ms: 0,
        ..GatewayConfig::default()
    }
}

fn server() -> (TestServer, GatewayState<GuideResponder>) {
    let state = GatewayState::new(Arc::new(GuideResponder::new()), config());
    let server = TestServer::new(create_router(state.clone())).unwrap();
    (server, state)
}

fn session_header(response: &axum_test::TestResponse) -> String {
    response
        .headers()
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let (server, _) = server();
    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "tourguide-gateway");
}

#[tokio::test]
async fn json_mode_returns_structured_answer() {
    let (server, state) = server();

    let response = server
        .post("/chat")
        .add_header(ACCEPT, HeaderValue::from_static("application/json"))
        .json(&json!({"message": "경복궁 관람 시간", "language": "ko", "age_group": "adult"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["assistant_response"]
        .as_str()
        .unwrap()
        .starts_with("경복궁은"));
    assert_eq!(
        body["sources"],
        json!(["Cultural Heritage Administration", "Visit Seoul"])
    );
    assert!(chrono::DateTime::parse_from_rfc3339(body["created_at"].as_str().unwrap()).is_ok());

    let session_id = body["session_id"].as_str().unwrap();
    assert_eq!(session_header(&response), session_id);
    assert_eq!(state.session_turns(session_id), Some(1));
}

#[tokio::test]
async fn stream_mode_returns_framed_text() {
    let (server, _) = server();

    let response = server
        .post("/chat")
        .add_header(ACCEPT, HeaderValue::from_static("text/plain"))
        .json(&json!({"message": "Namsan tower hours?", "language": "en", "age_group": "adult"}))
        .await;

    response.assert_status_ok();
    let content_type = response.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));

    let frame = framing::parse(&response.text());
    assert!(frame.text.starts_with("The N Seoul Tower observatory"));
    assert_eq!(frame.sources, Some(vec!["Visit Seoul".to_string()]));
    assert!(!session_header(&response).is_empty());
}

#[tokio::test]
async fn unknown_place_streams_without_trailer() {
    let (server, _) = server();

    let response = server
        .post("/chat")
        .json(&json!({"message": "Where is Atlantis?"}))
        .await;

    response.assert_status_ok();
    let text = response.text();
    assert!(!text.contains(framing::SOURCES_MARKER));
    assert!(framing::parse(&text).sources.is_none());
}

#[tokio::test]
async fn existing_session_is_continued() {
    let (server, state) = server();

    for _ in 0..2 {
        let response = server
            .post("/chat")
            .add_header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(&json!({"message": "jeju", "session_id": "trip-42"}))
            .await;
        response.assert_status_ok();
        assert_eq!(session_header(&response), "trip-42");
    }

    assert_eq!(state.session_turns("trip-42"), Some(2));
    assert_eq!(state.session_count(), 1);
}

#[tokio::test]
async fn blank_message_is_unprocessable() {
    let (server, state) = server();

    let response = server
        .post("/chat")
        .json(&json!({"message": "   "}))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["detail"], "message must not be empty");
    assert_eq!(state.session_count(), 0);
}

#[tokio::test]
async fn invalid_body_renders_detail_json() {
    let (server, state) = server();

    let response = server.post("/chat").json(&json!({"msg": 1})).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let content_type = response.headers().get(CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("application/json"));
    let body: Value = response.json();
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("missing field `message`"));
    assert_eq!(state.session_count(), 0);
}

#[tokio::test]
async fn non_json_body_keeps_extractor_status() {
    let (server, _) = server();

    let response = server.post("/chat").text("경복궁").await;

    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("application/json"));
}

#[tokio::test]
async fn custom_session_header_is_used() {
    let state = GatewayState::new(
        Arc::new(GuideResponder::new()),
        GatewayConfig {
            session_header: "x-conversation".to_string(),
            ..config()
        },
    );
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server
        .post("/chat")
        .json(&json!({"message": "hello", "session_id": "c-1"}))
        .await;

    response.assert_status_ok();
    let value = response
        .headers()
        .get(HeaderName::from_static("x-conversation"))
        .unwrap();
    assert_eq!(value, "c-1");
}

struct OfflineResponder;

#[async_trait]
impl Responder for OfflineResponder {
    async fn respond(&self, _query: &GuideQuery) -> Result<GuideAnswer, ApiError> {
        Err(ApiError::Internal("catalog offline".to_string()))
    }
}

#[tokio::test]
async fn responder_failure_is_passed_through() {
    let state = GatewayState::new(Arc::new(OfflineResponder), config());
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server
        .post("/chat")
        .json(&json!({"message": "경복궁"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["detail"], "internal error: catalog offline");
}
