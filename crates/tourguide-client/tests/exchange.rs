//! Chat exchanges against a mock assistant service.

use std::time::Duration;

use serde_json::{json, Value};
use tourguide_client::{
    AssistantClient, ChatEvent, ChatSession, ClientConfig, Phase, RejectReason, SendOutcome,
    UserProfile,
};
use tourguide_core::{Role, Turn, NO_ANSWER_FALLBACK, RETRY_NOTICE, SYSTEM_SOURCE};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_for(server: &MockServer, prefer_stream: bool) -> ChatSession {
    let config = ClientConfig {
        prefer_stream,
        request_timeout_seconds: 5,
        ..ClientConfig::with_base_url(server.uri())
    };
    ChatSession::new(AssistantClient::new(config).unwrap())
}

async fn completed(chat: &ChatSession, text: &str) -> Turn {
    match chat.send(text).await.unwrap() {
        SendOutcome::Completed(turn) => turn,
        SendOutcome::Rejected(reason) => panic!("Send rejected: {reason:?}"),
    }
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| serde_json::from_slice(&req.body).unwrap())
        .collect()
}

fn assert_system_notice(turn: &Turn) {
    assert_eq!(turn.role, Role::Assistant);
    assert_eq!(turn.sources, Some(vec![SYSTEM_SOURCE.to_string()]));
    assert!(!turn.content.is_empty());
}

// =============================================================================
// Structured responses
// =============================================================================

#[tokio::test]
async fn structured_answer_becomes_one_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assistant_response": "Bukchon is best early in the morning.  ",
            "sources": ["Visit Seoul", " Visit Seoul", ""],
            "created_at": "2024-05-05T09:30:00Z",
            "session_id": "s-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let chat = chat_for(&server, false);
    let turn = completed(&chat, "Bukchon tips?").await;

    assert_eq!(turn.content, "Bukchon is best early in the morning.");
    assert_eq!(turn.sources, Some(vec!["Visit Seoul".to_string()]));
    assert_eq!(turn.timestamp.to_rfc3339(), "2024-05-05T09:30:00+00:00");
    assert_eq!(chat.session_handle().as_deref(), Some("s-1"));
    assert_eq!(chat.phase(), Phase::Idle);

    let turns = chat.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].id, turn.id);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["message"], "Bukchon tips?");
    assert_eq!(bodies[0]["language"], "ko");
    assert_eq!(bodies[0]["age_group"], "adult");
    assert!(bodies[0].get("session_id").is_none());
}

#[tokio::test]
async fn structured_answer_uses_alternate_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Try the night market.",
            "conversation_id": "c-77"
        })))
        .mount(&server)
        .await;

    let chat = chat_for(&server, false);
    let turn = completed(&chat, "Busan food?").await;

    assert_eq!(turn.content, "Try the night market.");
    assert!(turn.sources.is_none());
    assert_eq!(chat.session_handle().as_deref(), Some("c-77"));
}

#[tokio::test]
async fn structured_answer_without_text_gets_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sources": []})))
        .mount(&server)
        .await;

    let chat = chat_for(&server, false);
    let turn = completed(&chat, "hello").await;

    assert_eq!(turn.content, NO_ANSWER_FALLBACK);
    assert!(turn.sources.is_none());
}

#[tokio::test]
async fn malformed_json_becomes_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
        .mount(&server)
        .await;

    let chat = chat_for(&server, false);
    let turn = completed(&chat, "hello").await;

    assert_system_notice(&turn);
    assert!(turn.content.starts_with("malformed response"));
    assert_eq!(chat.phase(), Phase::Idle);
}

// =============================================================================
// Streamed responses
// =============================================================================

#[tokio::test]
async fn streamed_answer_is_parsed_and_finalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("accept", "text/plain"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-session-id", "s-stream")
                .set_body_string("Haeundae is crowded in August. \n[SOURCES]Visit Busan| |Visit Busan"),
        )
        .mount(&server)
        .await;

    let chat = chat_for(&server, true);
    let turn = completed(&chat, "Haeundae?").await;

    assert_eq!(turn.content, "Haeundae is crowded in August.");
    assert_eq!(turn.sources, Some(vec!["Visit Busan".to_string()]));
    assert_eq!(chat.session_handle().as_deref(), Some("s-stream"));
    assert_eq!(chat.turns().len(), 2);
}

#[tokio::test]
async fn empty_stream_gets_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
        .mount(&server)
        .await;

    let chat = chat_for(&server, true);
    let turn = completed(&chat, "hello").await;

    assert_eq!(turn.content, NO_ANSWER_FALLBACK);
    assert!(turn.sources.is_none());
}

#[tokio::test]
async fn observers_see_every_update_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Open daily.\n[SOURCES]Visit Seoul"))
        .mount(&server)
        .await;

    let chat = chat_for(&server, true);
    let mut events = chat.subscribe();
    let turn = completed(&chat, "hours?").await;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert!(matches!(&seen[0], ChatEvent::TurnUpserted(t) if t.role == Role::User));
    assert_eq!(seen[1], ChatEvent::PhaseChanged(Phase::Sending));
    assert_eq!(seen.last(), Some(&ChatEvent::PhaseChanged(Phase::Idle)));
    assert_eq!(seen[seen.len() - 2], ChatEvent::TurnUpserted(turn.clone()));
    assert!(seen
        .iter()
        .filter_map(|e| match e {
            ChatEvent::TurnUpserted(t) if t.role == Role::Assistant => Some(t.id),
            _ => None,
        })
        .all(|id| id == turn.id));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn status_detail_is_shown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": " 점검 중입니다 "})))
        .mount(&server)
        .await;

    let chat = chat_for(&server, true);
    let turn = completed(&chat, "hello").await;

    assert_system_notice(&turn);
    assert_eq!(turn.content, "점검 중입니다");
}

#[tokio::test]
async fn status_without_detail_is_described() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let chat = chat_for(&server, false);
    let turn = completed(&chat, "hello").await;

    assert_system_notice(&turn);
    assert_eq!(turn.content, "request failed: 500");
    assert!(chat.session_handle().is_none());
}

#[tokio::test]
async fn connection_failure_is_one_notice() {
    let config = ClientConfig::with_base_url("http://127.0.0.1:1");
    let chat = ChatSession::new(AssistantClient::new(config).unwrap());

    let turn = completed(&chat, "hello").await;

    assert_system_notice(&turn);
    assert_eq!(turn.content, RETRY_NOTICE);
    assert_eq!(chat.turns().len(), 2);
    assert_eq!(chat.phase(), Phase::Idle);
}

/// Serve one request: answer with headers and a single chunk, then hang up
/// before the terminating chunk.
async fn serve_truncated_stream() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // Read the whole request so closing sends FIN, not RST.
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some((head, body)) = text.split_once("\r\n\r\n") {
                let length = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if body.len() >= length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  content-type: text/plain; charset=utf-8\r\n\
                  x-session-id: s-9\r\n\
                  transfer-encoding: chunked\r\n\r\n\
                  e\r\npartial answer\r\n",
            )
            .await
            .unwrap();
        socket.flush().await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn connection_lost_mid_stream_is_one_notice() {
    let base_url = serve_truncated_stream().await;
    let config = ClientConfig {
        prefer_stream: true,
        request_timeout_seconds: 5,
        ..ClientConfig::with_base_url(base_url)
    };
    let chat = ChatSession::new(AssistantClient::new(config).unwrap());

    let turn = completed(&chat, "hello").await;

    assert_system_notice(&turn);
    assert_eq!(turn.content, RETRY_NOTICE);
    assert_eq!(chat.turns().len(), 2);
    assert_eq!(chat.phase(), Phase::Idle);
    assert_eq!(chat.session_handle().as_deref(), Some("s-9"));
}

#[tokio::test]
async fn timeout_is_one_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig {
        request_timeout_seconds: 1,
        ..ClientConfig::with_base_url(server.uri())
    };
    let chat = ChatSession::new(AssistantClient::new(config).unwrap());
    let turn = completed(&chat, "hello").await;

    assert_system_notice(&turn);
    assert_eq!(turn.content, RETRY_NOTICE);
    assert_eq!(chat.turns().len(), 2);
    assert_eq!(chat.phase(), Phase::Idle);
}

#[tokio::test]
async fn cancel_before_reply_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("never shown")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let chat = chat_for(&server, true);
    let (outcome, ()) = tokio::join!(chat.send("hello"), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        chat.cancel();
    });

    let SendOutcome::Completed(turn) = outcome.unwrap() else {
        panic!("Expected a completed exchange");
    };
    assert_system_notice(&turn);
    assert_eq!(turn.content, RETRY_NOTICE);
    assert_eq!(chat.turns().len(), 2);
    assert_eq!(chat.phase(), Phase::Idle);
}

// =============================================================================
// Orchestration
// =============================================================================

#[tokio::test]
async fn second_send_while_sending_is_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("first answer")
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let chat = chat_for(&server, true);
    let (first, second) = tokio::join!(chat.send("first"), chat.send("second"));

    assert!(matches!(first.unwrap(), SendOutcome::Completed(ref t) if t.content == "first answer"));
    assert_eq!(
        second.unwrap(),
        SendOutcome::Rejected(RejectReason::Busy)
    );

    let turns = chat.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, "first");
}

#[tokio::test]
async fn handle_is_reused_until_subject_changes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-session-id", "s-1")
                .set_body_string("ok"),
        )
        .mount(&server)
        .await;

    let chat = chat_for(&server, true);
    completed(&chat, "one").await;
    completed(&chat, "two").await;
    assert!(chat.set_subject(Some("Gyeongju".to_string())));
    assert!(chat.session_handle().is_none());
    completed(&chat, "three").await;

    let bodies = request_bodies(&server).await;
    assert!(bodies[0].get("session_id").is_none());
    assert_eq!(bodies[1]["session_id"], "s-1");
    assert!(bodies[2].get("session_id").is_none());

    let turns = chat.turns();
    assert_eq!(turns[4].subject.as_deref(), Some("Gyeongju"));
    assert_eq!(turns[5].subject.as_deref(), Some("Gyeongju"));
}

#[tokio::test]
async fn profile_drives_language_and_audience() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = AssistantClient::new(ClientConfig::with_base_url(server.uri())).unwrap();
    let profile = UserProfile {
        language: Some("ja".to_string()),
        level: Some("초등학생".to_string()),
    };
    let chat = ChatSession::with_profile(client, profile);
    chat.set_input("  Seoraksan?  ");

    chat.submit().await.unwrap();

    assert!(chat.input().is_empty());
    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["message"], "Seoraksan?");
    assert_eq!(bodies[0]["language"], "ja");
    assert_eq!(bodies[0]["age_group"], "child");
}
