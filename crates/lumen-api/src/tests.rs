//! Router tests against a `MemoryStore`, with a throwaway local axum server
//! standing in for the generation webhooks.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use axum::{
  Json, Router,
  body::Body,
  extract::State,
  http::{Request, StatusCode},
  routing::post,
};
use lumen_core::{
  category::{ResultCategory, ResultState},
  memory::MemoryStore,
  store::{ResultStore, SubjectKind},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt as _;

use crate::{AppState, WebhookClient, WebhookError, api_router};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Serve a fake webhook on an ephemeral port and return its base URL.
async fn spawn_webhook(calls: Arc<AtomicUsize>) -> String {
  async fn questions(State(calls): State<Arc<AtomicUsize>>) -> Json<Value> {
    calls.fetch_add(1, Ordering::SeqCst);
    Json(json!([{ "question": "Q1", "options": ["A", "B"] }]))
  }
  async fn empty(State(calls): State<Arc<AtomicUsize>>) -> StatusCode {
    calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
  }
  async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "workflow crashed")
  }
  async fn garbage() -> &'static str { "<html>not json</html>" }

  let app = Router::new()
    .route("/questions", post(questions))
    .route("/empty", post(empty))
    .route("/broken", post(broken))
    .route("/garbage", post(garbage))
    .with_state(calls);

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  format!("http://{addr}")
}

struct Harness {
  app:   Router,
  store: MemoryStore,
  calls: Arc<AtomicUsize>,
}

async fn harness() -> Harness {
  let calls = Arc::new(AtomicUsize::new(0));
  let base = spawn_webhook(calls.clone()).await;

  let endpoints = HashMap::from([
    (ResultCategory::ModuleContent, format!("{base}/questions")),
    (ResultCategory::AssessmentQuestions, format!("{base}/questions")),
    (ResultCategory::Transcript, format!("{base}/empty")),
    (ResultCategory::LearningPath, format!("{base}/broken")),
  ]);
  let webhook = WebhookClient::new(endpoints, Duration::from_secs(5)).unwrap();

  let store = MemoryStore::new();
  let app = api_router(AppState::new(store.clone(), webhook, 24));
  Harness { app, store, calls }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
  let resp = app.clone().oneshot(request).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, body)
}

fn get(uri: &str) -> Request<Body> {
  Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(uri)
    .header("content-type", "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
  Request::builder()
    .method("DELETE")
    .uri(uri)
    .body(Body::empty())
    .unwrap()
}

// ─── Generate ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_caches_webhook_result() {
  let h = harness().await;
  let body = json!({ "subject_key": "STU123", "payload": { "moduleId": "MOD42" } });

  let (status, first) = send(&h.app, post_json("/generate/module_content", body.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["from_cache"], json!(false));
  assert_eq!(first["result"][0]["question"], json!("Q1"));

  let (status, second) = send(&h.app, post_json("/generate/module_content", body)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(second["from_cache"], json!(true));
  assert_eq!(second["record_id"], first["record_id"]);
  assert_eq!(second["result"], first["result"]);

  assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn generate_force_regenerate_calls_webhook_again() {
  let h = harness().await;
  send(
    &h.app,
    post_json("/generate/module_content", json!({ "subject_key": "STU123" })),
  )
  .await;
  let (status, forced) = send(
    &h.app,
    post_json(
      "/generate/module_content",
      json!({ "subject_key": "STU123", "force_regenerate": true }),
    ),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(forced["from_cache"], json!(false));
  assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn generate_patches_subject_when_asked() {
  let h = harness().await;
  let (status, generated) = send(
    &h.app,
    post_json(
      "/generate/assessment_questions",
      json!({
        "subject_key": "STU123",
        "patch_subject": { "kind": "assessment", "key": "ASMT-7" }
      }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, patch) = send(
    &h.app,
    get("/subjects/assessment/ASMT-7/assessment_questions"),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(patch["cached_result_id"], generated["record_id"]);
  assert_eq!(patch["payload"], generated["result"]);
}

#[tokio::test]
async fn generate_empty_webhook_body_is_recorded_failure() {
  let h = harness().await;
  let (status, body) = send(
    &h.app,
    post_json("/generate/transcript", json!({ "subject_key": "STU123" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert!(body["error"].as_str().unwrap().contains("empty body"));

  let history = h.store.list_results("STU123", None).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].state, ResultState::Failed);
  assert!(
    history[0]
      .failure_reason
      .as_deref()
      .is_some_and(|r| r.contains("empty body"))
  );
}

#[tokio::test]
async fn generate_upstream_error_status_is_bad_gateway() {
  let h = harness().await;
  let (status, body) = send(
    &h.app,
    post_json("/generate/learning_path", json!({ "subject_key": "STU123" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert!(body["error"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn generate_without_configured_webhook_is_bad_request() {
  let h = harness().await;
  let (status, _) = send(
    &h.app,
    post_json("/generate/career_analysis", json!({ "subject_key": "STU123" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(h.store.stats().await.unwrap().total, 0);
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_cached_404_then_hit() {
  let h = harness().await;
  let (status, _) = send(&h.app, get("/results/STU123/module_content")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  send(
    &h.app,
    post_json("/generate/module_content", json!({ "subject_key": "STU123" })),
  )
  .await;

  let (status, record) = send(&h.app, get("/results/STU123/module_content")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(record["state"], json!("completed"));
  assert_eq!(record["category"], json!("module_content"));

  let id = record["result_id"].as_str().unwrap();
  let (status, same) = send(&h.app, get(&format!("/records/{id}"))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(same, record);
}

#[tokio::test]
async fn unknown_category_is_rejected() {
  let h = harness().await;
  let (status, body) = send(&h.app, get("/results/STU123/quiz")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn malformed_record_id_is_json_bad_request() {
  let h = harness().await;
  let (status, body) = send(&h.app, get("/records/not-a-uuid")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_expiry_query_is_json_bad_request() {
  let h = harness().await;
  let (status, body) = send(
    &h.app,
    get("/results/STU123/module_content?cache_expiry_hours=soon"),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_generate_body_is_json_bad_request() {
  let h = harness().await;

  // Missing the required `subject_key`.
  let (status, body) = send(
    &h.app,
    post_json("/generate/module_content", json!({ "payload": {} })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  let raw = Request::builder()
    .method("POST")
    .uri("/generate/module_content")
    .header("content-type", "application/json")
    .body(Body::from("{not json"))
    .unwrap();
  let (status, body) = send(&h.app, raw).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
  assert_eq!(h.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn clear_and_stats() {
  let h = harness().await;
  for (subject, category) in [
    ("STU123", "module_content"),
    ("STU123", "assessment_questions"),
    ("STU999", "module_content"),
  ] {
    send(
      &h.app,
      post_json(&format!("/generate/{category}"), json!({ "subject_key": subject })),
    )
    .await;
  }

  let (_, stats) = send(&h.app, get("/stats")).await;
  assert_eq!(stats["total"], json!(3));
  assert_eq!(stats["by_category"]["module_content"], json!(2));

  let (status, cleared) = send(&h.app, delete("/results/STU123?category=module_content")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(cleared["deleted"], json!(1));

  let (_, history) = send(&h.app, get("/results/STU123")).await;
  assert_eq!(history.as_array().unwrap().len(), 1);
  assert_eq!(history[0]["category"], json!("assessment_questions"));

  let (_, stats) = send(&h.app, get("/stats")).await;
  assert_eq!(stats["total"], json!(2));
  assert_eq!(stats["by_state"]["completed"], json!(2));
}

#[tokio::test]
async fn missing_subject_patch_is_404() {
  let h = harness().await;
  let (status, _) = send(&h.app, get("/subjects/module/MOD42/module_content")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(
    h.store
      .get_subject_patch(SubjectKind::Module, "MOD42", ResultCategory::ModuleContent)
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Webhook client ──────────────────────────────────────────────────────────

#[tokio::test]
async fn webhook_rejects_non_json_body() {
  let base = spawn_webhook(Arc::new(AtomicUsize::new(0))).await;
  let client = WebhookClient::new(HashMap::new(), Duration::from_secs(5)).unwrap();

  let err = client
    .call(&format!("{base}/garbage"), &Value::Null)
    .await
    .unwrap_err();
  assert!(matches!(err, WebhookError::InvalidJson { .. }));
}

#[tokio::test]
async fn webhook_unreachable_is_request_error() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let client = WebhookClient::new(HashMap::new(), Duration::from_secs(5)).unwrap();
  let err = client
    .call(&format!("http://{addr}/questions"), &json!({}))
    .await
    .unwrap_err();
  assert!(matches!(err, WebhookError::Request { .. }));
}
