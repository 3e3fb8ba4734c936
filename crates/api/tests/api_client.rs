//! End-to-end tests for the endpoint wrappers against an in-process backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use parley_api::{ApiClient, ApiError, MAX_ATTACHMENTS, OutgoingAttachment};
use parley_config::ApiConfig;

#[derive(Default)]
struct MockState {
    message_posts: AtomicUsize,
    last_content: Mutex<Option<String>>,
    last_attachment_count: AtomicUsize,
    deleted: Mutex<Vec<(String, String)>>,
}

fn envelope(data: Value) -> Json<Value> {
    Json(json!({
        "statusCode": 200,
        "data": data,
        "message": "ok",
        "success": true
    }))
}

fn rejection(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "statusCode": status.as_u16(),
            "data": null,
            "message": message,
            "success": false
        })),
    )
}

fn user(id: &str, username: &str) -> Value {
    json!({
        "_id": id,
        "username": username,
        "email": format!("{username}@example.com"),
        "role": "USER"
    })
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

async fn login(Json(body): Json<Value>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if body["password"] == "secret" {
        Ok(envelope(json!({
            "user": user("u1", "ana"),
            "accessToken": "access-1",
            "refreshToken": "refresh-1"
        })))
    } else {
        Err(rejection(StatusCode::UNAUTHORIZED, "Invalid credentials"))
    }
}

async fn list_chats(headers: HeaderMap) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if bearer(&headers) != Some("access-1") {
        return Err(rejection(StatusCode::UNAUTHORIZED, "Unauthorized request"));
    }
    Ok(envelope(json!([
        {
            "_id": "chat-1",
            "isGroupChat": false,
            "participants": [user("u1", "ana"), user("u2", "ben")]
        },
        {
            "_id": "chat-2",
            "isGroupChat": true,
            "name": "standup",
            "participants": [user("u1", "ana"), user("u2", "ben"), user("u3", "cid")]
        }
    ])))
}

async fn post_message(
    State(state): State<Arc<MockState>>,
    Path(chat_id): Path<String>,
    mut multipart: Multipart,
) -> Json<Value> {
    state.message_posts.fetch_add(1, Ordering::SeqCst);

    let mut content = String::new();
    let mut attachment_count = 0usize;
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        match field.name() {
            Some("content") => content = field.text().await.expect("content text"),
            Some("attachments") => {
                let _ = field.bytes().await.expect("attachment bytes");
                attachment_count += 1;
            }
            _ => {}
        }
    }

    *state.last_content.lock().expect("lock") = Some(content.clone());
    state
        .last_attachment_count
        .store(attachment_count, Ordering::SeqCst);

    envelope(json!({
        "_id": "msg-1",
        "sender": user("u1", "ana"),
        "content": content,
        "attachments": [],
        "chat": chat_id,
        "createdAt": "2024-03-01T10:00:00.000Z"
    }))
}

async fn delete_message(
    State(state): State<Arc<MockState>>,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Json<Value> {
    state
        .deleted
        .lock()
        .expect("lock")
        .push((chat_id, message_id));
    envelope(json!({}))
}

async fn get_messages(Path(chat_id): Path<String>) -> Json<Value> {
    if chat_id == "bare-chat" {
        // Deliberately not wrapped in the response envelope.
        return Json(json!([{"_id": "msg-raw"}]));
    }
    envelope(json!([
        {
            "_id": "msg-1",
            "sender": user("u2", "ben"),
            "content": "hi",
            "attachments": [],
            "createdAt": "2024-03-01T10:00:00.000Z"
        }
    ]))
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/chat-app/chats", get(list_chats))
        .route(
            "/api/v1/chat-app/messages/:chat_id",
            get(get_messages).post(post_message),
        )
        .route(
            "/api/v1/chat-app/messages/:chat_id/:message_id",
            axum::routing::delete(delete_message),
        )
        .with_state(state)
}

async fn spawn_backend(state: Arc<MockState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let address = listener.local_addr().expect("local addr");
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock backend");
    });
    format!("http://{address}/api/v1")
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(&ApiConfig {
        base_url: base_url.to_string(),
        request_timeout_seconds: 5,
    })
    .expect("client")
}

#[tokio::test]
async fn login_returns_identity_and_tokens() {
    let base_url = spawn_backend(Arc::new(MockState::default())).await;
    let client = client(&base_url);

    let data = client.login("ana@example.com", "secret").await.expect("login");
    assert_eq!(data.user.username, "ana");
    assert_eq!(data.access_token, "access-1");
    assert_eq!(data.refresh_token, "refresh-1");
}

#[tokio::test]
async fn bad_credentials_surface_the_backend_message() {
    let base_url = spawn_backend(Arc::new(MockState::default())).await;
    let client = client(&base_url);

    let error = client
        .login("ana@example.com", "wrong")
        .await
        .expect_err("should reject");
    assert!(error.is_unauthorized());
    assert_eq!(error.to_string(), "Invalid credentials");
}

#[tokio::test]
async fn list_chats_decodes_typed_conversations() {
    let base_url = spawn_backend(Arc::new(MockState::default())).await;
    let client = client(&base_url);

    let chats = client.list_chats("access-1").await.expect("chats");
    assert_eq!(chats.len(), 2);
    assert!(!chats[0].is_group);
    assert!(chats[1].is_group);
    assert_eq!(chats[1].name.as_deref(), Some("standup"));
    assert_eq!(chats[0].label("u1"), "ben");
}

#[tokio::test]
async fn send_message_submits_content_and_attachments_as_multipart() {
    let state = Arc::new(MockState::default());
    let base_url = spawn_backend(state.clone()).await;
    let client = client(&base_url);

    let attachments = vec![
        OutgoingAttachment {
            file_name: "a.png".to_string(),
            bytes: vec![1, 2, 3],
        },
        OutgoingAttachment {
            file_name: "b.png".to_string(),
            bytes: vec![4, 5],
        },
    ];
    let message = client
        .send_message("access-1", "chat-1", "hello there", attachments)
        .await
        .expect("send");

    assert_eq!(message.content, "hello there");
    assert_eq!(
        state.last_content.lock().expect("lock").as_deref(),
        Some("hello there")
    );
    assert_eq!(state.last_attachment_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn attachment_cap_is_enforced_before_any_request() {
    let state = Arc::new(MockState::default());
    let base_url = spawn_backend(state.clone()).await;
    let client = client(&base_url);

    let attachments = (0..MAX_ATTACHMENTS + 1)
        .map(|index| OutgoingAttachment {
            file_name: format!("file-{index}.png"),
            bytes: vec![0],
        })
        .collect();
    let error = client
        .send_message("access-1", "chat-1", "hello", attachments)
        .await
        .expect_err("should reject");

    assert!(matches!(
        error,
        ApiError::TooManyAttachments { count: 6, limit: 5 }
    ));
    assert_eq!(state.message_posts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delete_message_targets_the_expected_route() {
    let state = Arc::new(MockState::default());
    let base_url = spawn_backend(state.clone()).await;
    let client = client(&base_url);

    client
        .delete_message("access-1", "chat-1", "msg-9")
        .await
        .expect("delete");

    let deleted = state.deleted.lock().expect("lock");
    assert_eq!(
        deleted.as_slice(),
        &[("chat-1".to_string(), "msg-9".to_string())]
    );
}

#[tokio::test]
async fn message_history_decodes_typed_messages() {
    let base_url = spawn_backend(Arc::new(MockState::default())).await;
    let client = client(&base_url);

    let messages = client.list_messages("access-1", "chat-1").await.expect("history");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender.username, "ben");
    assert_eq!(messages[0].content, "hi");
}

#[tokio::test]
async fn missing_envelope_is_reported_as_unexpected() {
    let base_url = spawn_backend(Arc::new(MockState::default())).await;
    let client = client(&base_url);

    let error = client
        .list_messages("access-1", "bare-chat")
        .await
        .expect_err("bare payload should fail to decode");
    assert!(matches!(error, ApiError::Unexpected(_)));
}
