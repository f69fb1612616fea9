use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use journal_agent::llm::{LlmClient, LlmError, LlmResponse, Message, ToolCall, ToolDefinition};
use journal_agent::AgentRuntime;
use journal_core::JournalConfig;
use journal_gateway::app::{build_router, AppState};
use journal_store::Store;

/// Replays a fixed sequence of responses, one per `complete()` call,
/// regardless of the prompt. Used to script both the agent's own tool-use
/// turn and the structurer's follow-up classification call.
struct ScriptedLlm {
    responses: Mutex<Vec<Result<LlmResponse, LlmError>>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(mut responses: Vec<Result<LlmResponse, LlmError>>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        _system: &str,
        _history: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(LlmError::Parse("script exhausted".into())))
    }
}

fn text_response(text: &str) -> Result<LlmResponse, LlmError> {
    Ok(LlmResponse {
        text: text.to_string(),
        tool_calls: Vec::new(),
        stop_reason: "end_turn".to_string(),
    })
}

fn tool_call_response(name: &str, input: Value) -> Result<LlmResponse, LlmError> {
    Ok(LlmResponse {
        text: String::new(),
        tool_calls: vec![ToolCall {
            id: "call_1".into(),
            name: name.to_string(),
            input,
        }],
        stop_reason: "tool_use".to_string(),
    })
}

fn test_config() -> JournalConfig {
    JournalConfig {
        server: Default::default(),
        database: Default::default(),
        auth: journal_core::config::AuthConfig {
            jwt_secret: "test-secret".into(),
            jwt_algorithm: "HS256".into(),
            token_lifetime_secs: 86_400,
        },
        llm: journal_core::config::LlmConfig {
            provider: "anthropic".into(),
            api_key: "test-key".into(),
            base_url: "https://example.invalid".into(),
            model: "test-model".into(),
            request_timeout_secs: 30,
        },
        debug: Default::default(),
    }
}

fn build_app(responses: Vec<Result<LlmResponse, LlmError>>) -> Arc<AppState> {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let store = Store::new(conn).unwrap();
    let llm = ScriptedLlm::new(responses);
    let agent = AgentRuntime::new(Box::new(llm));
    Arc::new(AppState::new(store, test_config(), agent))
}

async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn register_and_login(app: &axum::Router) -> String {
    let (status, _) = send(
        app.clone(),
        json_request("POST", "/auth/register", None, json!({"username": "alice", "password": "pw123456"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app.clone(),
        json_request("POST", "/auth/login", None, json!({"username": "alice", "password": "pw123456"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn s1_register_login_me() {
    let state = build_app(vec![]);
    let app = build_router(state);
    let token = register_and_login(&app).await;

    let (status, body) = send(app.clone(), json_request("GET", "/auth/me", Some(&token), Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, _) = send(
        app.clone(),
        json_request("POST", "/auth/register", None, json!({"username": "bob", "password": "pw12"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn s2_simple_journaling_loop() {
    let state = build_app(vec![
        tool_call_response("structure_journal", json!({"text": "I felt sad today"})),
        text_response(r#"{"Thoughts & Feelings": "felt sad today"}"#),
        text_response("Noted that you're feeling sad."),
        tool_call_response("save_journal", json!({"confirm": true})),
        text_response("Saved it for you."),
    ]);
    let app = build_router(state);
    let token = register_and_login(&app).await;

    let (status, body) = send(app.clone(), json_request("POST", "/sessions", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            &format!("/agent/chat/{session_id}"),
            Some(&token),
            json!({"text": "I felt sad today"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["text"].as_str().unwrap().is_empty());
    let draft = body["updated_draft_data"].as_object().unwrap();
    assert!(draft.values().any(|v| v.as_str().unwrap_or_default().contains("sad")));
    let tool_calls = body["tool_calls"].as_array().unwrap();
    assert!(tool_calls.iter().any(|c| c["name"] == "structure_journal"));

    let (status, body) = send(
        app.clone(),
        json_request("POST", &format!("/agent/chat/{session_id}"), Some(&token), json!({"text": "save it"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tool_calls = body["tool_calls"].as_array().unwrap();
    assert!(tool_calls.iter().any(|c| c["name"] == "save_journal"));
    assert!(body["updated_draft_data"].as_object().unwrap().is_empty());

    let (status, body) = send(app.clone(), json_request("GET", "/journal-entries", Some(&token), Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0]["structured_data"].to_string().contains("sad"));
}

#[tokio::test]
async fn s4_task_reorder_invariant() {
    let state = build_app(vec![]);
    let app = build_router(state);
    let token = register_and_login(&app).await;

    let mut ids = Vec::new();
    for title in ["T1", "T2", "T3"] {
        let (status, body) =
            send(app.clone(), json_request("POST", "/tasks", Some(&token), json!({"title": title}))).await;
        assert_eq!(status, StatusCode::OK);
        ids.push(body["id"].as_str().unwrap().to_string());
    }
    let (t1, t2, t3) = (ids[0].clone(), ids[1].clone(), ids[2].clone());

    let (status, _) = send(
        app.clone(),
        json_request(
            "POST",
            "/tasks/reorder",
            Some(&token),
            json!({"task_orders": [
                {"task_id": t3, "new_priority": 1},
                {"task_id": t1, "new_priority": 2},
                {"task_id": t2, "new_priority": 3},
            ]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(app.clone(), json_request("GET", "/tasks", Some(&token), Value::Null)).await;
    let ordered: Vec<String> = body.as_array().unwrap().iter().map(|t| t["id"].as_str().unwrap().to_string()).collect();
    assert_eq!(ordered, vec![ids[2].clone(), ids[0].clone(), ids[1].clone()]);

    let (status, _) = send(
        app.clone(),
        json_request(
            "POST",
            "/tasks/reorder",
            Some(&token),
            json!({"task_orders": [
                {"task_id": ids[2], "new_priority": 1},
                {"task_id": ids[0], "new_priority": 2},
            ]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(app.clone(), json_request("GET", "/tasks", Some(&token), Value::Null)).await;
    let unchanged: Vec<String> = body.as_array().unwrap().iter().map(|t| t["id"].as_str().unwrap().to_string()).collect();
    assert_eq!(unchanged, vec![ids[2].clone(), ids[0].clone(), ids[1].clone()]);
}

#[tokio::test]
async fn s5_llm_outage_leaves_no_orphaned_message() {
    let state = build_app(vec![Err(LlmError::Transport(
        reqwest::Client::new()
            .get("http://127.0.0.1:1")
            .send()
            .await
            .unwrap_err(),
    ))]);
    let app = build_router(state);
    let token = register_and_login(&app).await;

    let (_, body) = send(app.clone(), json_request("POST", "/sessions", Some(&token), json!({}))).await;
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app.clone(),
        json_request("POST", &format!("/agent/chat/{session_id}"), Some(&token), json!({"text": "anything"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn s6_cross_user_isolation() {
    let state = build_app(vec![]);
    let app = build_router(state);

    let (status, _) = send(
        app.clone(),
        json_request("POST", "/auth/register", None, json!({"username": "user_a", "password": "pw123456"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(
        app.clone(),
        json_request("POST", "/auth/login", None, json!({"username": "user_a", "password": "pw123456"})),
    )
    .await;
    let token_a = body["access_token"].as_str().unwrap().to_string();

    send(
        app.clone(),
        json_request("POST", "/auth/register", None, json!({"username": "user_b", "password": "pw123456"})),
    )
    .await;
    let (_, body) = send(
        app.clone(),
        json_request("POST", "/auth/login", None, json!({"username": "user_b", "password": "pw123456"})),
    )
    .await;
    let token_b = body["access_token"].as_str().unwrap().to_string();

    let (_, body) = send(app.clone(), json_request("POST", "/sessions", Some(&token_a), json!({}))).await;
    let session_a = body["session_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app.clone(),
        json_request(
            "POST",
            &format!("/agent/chat/{session_a}"),
            Some(&token_b),
            json!({"text": "snooping"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
