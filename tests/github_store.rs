use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use article_sync::{
    CacheError, Document, DocumentCache, DocumentStore, MemoryCache, RepoConfig, StoreError,
};

/// In-process stand-in for the parts of the GitHub API the store uses
#[derive(Default)]
struct FakeGitHub {
    /// (sha, base64 content) of data/articles.json
    file: Option<(String, String)>,
    repo_status: Option<u16>,
    /// Answer GET /repos with a 200 that is not JSON
    repo_garbage: bool,
    get_status: Option<u16>,
    put_failure: Option<(u16, String)>,
    too_large: bool,
    puts: Vec<Value>,
    requests: usize,
    last_auth: Option<String>,
    last_accept: Option<String>,
    last_ref: Option<String>,
}

type Shared = Arc<Mutex<FakeGitHub>>;

fn error_body(status: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap();
    (status, Json(json!({ "message": message }))).into_response()
}

fn record(state: &mut FakeGitHub, headers: &HeaderMap) {
    state.requests += 1;
    state.last_auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.last_accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
}

async fn get_repo(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, &headers);

    if let Some(status) = state.repo_status {
        return error_body(status, "Bad credentials");
    }
    if state.repo_garbage {
        return (StatusCode::OK, "<html>captive portal</html>").into_response();
    }
    Json(json!({
        "full_name": format!("{}/{}", owner, repo),
        "private": true,
        "default_branch": "main",
    }))
    .into_response()
}

async fn get_contents(
    State(state): State<Shared>,
    Path((_owner, _repo, _path)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, &headers);
    state.last_ref = query.get("ref").cloned();

    if let Some(status) = state.get_status {
        return error_body(status, "Server Error");
    }
    let too_large = state.too_large;
    match &state.file {
        None => error_body(404, "Not Found"),
        Some((sha, content)) if too_large => Json(json!({
            "sha": sha,
            "content": "",
            "encoding": "none",
            "size": content.len() * 1000,
        }))
        .into_response(),
        Some((sha, content)) => {
            // GitHub wraps base64 at 60 columns
            let wrapped: String = content
                .as_bytes()
                .chunks(60)
                .map(|c| format!("{}\n", std::str::from_utf8(c).unwrap()))
                .collect();
            Json(json!({
                "sha": sha,
                "content": wrapped,
                "encoding": "base64",
                "size": content.len(),
            }))
            .into_response()
        }
    }
}

async fn put_contents(
    State(state): State<Shared>,
    Path((_owner, _repo, _path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, &headers);
    state.puts.push(body.clone());

    if let Some((status, message)) = state.put_failure.clone() {
        return error_body(status, &message);
    }

    let sent_sha = body.get("sha").and_then(Value::as_str).map(str::to_string);
    let current_sha = state.file.as_ref().map(|(sha, _)| sha.clone());
    if sent_sha != current_sha {
        return error_body(409, "data/articles.json does not match");
    }

    let new_sha = format!("sha-{}", state.puts.len());
    let content = body["content"].as_str().unwrap_or_default().to_string();
    let created = state.file.is_none();
    state.file = Some((new_sha.clone(), content));

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    (status, Json(json!({ "content": { "sha": new_sha } }))).into_response()
}

async fn spawn_fake(state: Shared) -> String {
    let app = Router::new()
        .route("/repos/{owner}/{repo}", get(get_repo))
        .route(
            "/repos/{owner}/{repo}/contents/{*path}",
            get(get_contents).put(put_contents),
        )
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

/// Base URL of a port nothing is listening on
async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn configured(api_base: &str) -> RepoConfig {
    RepoConfig {
        token: "ghp_test".to_string(),
        owner: "fuwa".to_string(),
        repo: "diary".to_string(),
        ..RepoConfig::default()
    }
    .with_api_base(api_base)
}

/// Cache whose writes always fail
struct FailingCache;

impl DocumentCache for FailingCache {
    fn load(&self) -> Result<Option<Document>, CacheError> {
        Ok(None)
    }

    fn store(&self, _document: &Document) -> Result<(), CacheError> {
        Err(CacheError::Poisoned)
    }
}

fn store<C: DocumentCache>(config: RepoConfig, cache: C) -> DocumentStore<C> {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    DocumentStore::with_http_client(config, cache, http)
}

fn encoded(document: &Value) -> String {
    STANDARD.encode(serde_json::to_string_pretty(document).unwrap())
}

fn decoded(content: &Value) -> Value {
    let bytes = STANDARD.decode(content.as_str().unwrap()).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn fetch_missing_document_is_empty() {
    let fake = Shared::default();
    let base = spawn_fake(fake.clone()).await;
    let cache = MemoryCache::with_document(vec![json!({"title": "stale"})]);
    let store = store(configured(&base), cache);

    assert!(store.fetch_document().await.is_empty());
    assert_eq!(fake.lock().unwrap().last_ref.as_deref(), Some("main"));
}

#[tokio::test]
async fn fetch_decodes_remote_document() {
    let fake = Shared::default();
    let doc = json!([{"title": "ふわこ", "body": "x".repeat(120)}]);
    fake.lock().unwrap().file = Some(("abc".to_string(), encoded(&doc)));
    let base = spawn_fake(fake.clone()).await;

    let mut config = configured(&base);
    config.branch = "pages".to_string();
    let store = store(config, MemoryCache::new());

    assert_eq!(Value::Array(store.fetch_document().await), doc);

    let fake = fake.lock().unwrap();
    assert_eq!(fake.last_ref.as_deref(), Some("pages"));
    assert_eq!(fake.last_auth.as_deref(), Some("token ghp_test"));
    assert_eq!(fake.last_accept.as_deref(), Some("application/vnd.github.v3+json"));
}

#[tokio::test]
async fn fetch_server_error_falls_back_to_cache() {
    let fake = Shared::default();
    fake.lock().unwrap().get_status = Some(500);
    let base = spawn_fake(fake.clone()).await;

    let cached = vec![json!({"title": "local"})];
    let store = store(configured(&base), MemoryCache::with_document(cached.clone()));

    assert_eq!(store.fetch_document().await, cached);
}

#[tokio::test]
async fn fetch_oversized_file_falls_back_to_cache() {
    let fake = Shared::default();
    {
        let mut fake = fake.lock().unwrap();
        fake.file = Some(("abc".to_string(), encoded(&json!([1, 2, 3]))));
        fake.too_large = true;
    }
    let base = spawn_fake(fake.clone()).await;

    let cached = vec![json!({"title": "local"})];
    let store = store(configured(&base), MemoryCache::with_document(cached.clone()));

    assert_eq!(store.fetch_document().await, cached);
}

#[tokio::test]
async fn save_creates_file_without_sha() {
    let fake = Shared::default();
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), MemoryCache::new());

    let doc = vec![json!({"title": "a"})];
    let result = store.save_document(&doc).await;
    assert!(result.success, "{}", result.message);

    let fake = fake.lock().unwrap();
    assert_eq!(fake.puts.len(), 1);
    let put = &fake.puts[0];
    assert!(put.get("sha").is_none());
    assert_eq!(put["branch"], "main");
    assert!(put["message"].as_str().unwrap().starts_with("Update diary - "));
    assert_eq!(decoded(&put["content"]), json!([{"title": "a"}]));

    assert_eq!(store.cache().load().unwrap(), Some(doc));
}

#[tokio::test]
async fn save_updates_with_current_sha() {
    let fake = Shared::default();
    fake.lock().unwrap().file = Some(("abc123".to_string(), encoded(&json!([]))));
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), MemoryCache::new());

    let result = store.save_document(&vec![json!({"title": "b"})]).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(fake.lock().unwrap().puts[0]["sha"], "abc123");
}

#[tokio::test]
async fn save_conflict_reports_failure_and_keeps_local_copy() {
    let fake = Shared::default();
    fake.lock().unwrap().put_failure = Some((409, "sha does not match".to_string()));
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), MemoryCache::new());

    let doc = vec![json!({"title": "a"})];
    let result = store.save_document(&doc).await;

    assert!(!result.success);
    assert!(result.message.contains("Failed"));
    assert!(result.message.contains("sha does not match"));
    assert!(result.message.contains("saved locally"));
    assert_eq!(store.cache().load().unwrap(), Some(doc));
}

#[tokio::test]
async fn save_with_failed_revision_lookup_writes_without_sha() {
    let fake = Shared::default();
    fake.lock().unwrap().get_status = Some(503);
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), MemoryCache::new());

    let result = store.save_document(&vec![json!({"title": "a"})]).await;
    assert!(result.success, "{}", result.message);
    assert!(fake.lock().unwrap().puts[0].get("sha").is_none());
}

#[tokio::test]
async fn save_then_fetch_through_remote() {
    let fake = Shared::default();
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), MemoryCache::new());

    let first = vec![json!({"title": "一"})];
    let second = vec![json!({"title": "一"}), json!({"title": "二", "tags": ["x"]})];

    assert!(store.save_document(&first).await.success);
    assert!(store.save_document(&second).await.success);
    assert_eq!(store.fetch_document().await, second);

    // Second write must have carried the sha returned by the first
    assert_eq!(fake.lock().unwrap().puts[1]["sha"], "sha-1");
}

#[tokio::test]
async fn unreachable_remote_round_trip_uses_cache() {
    let base = closed_port().await;
    let store = store(configured(&base), MemoryCache::new());

    let doc = vec![json!({"title": "offline"})];
    let result = store.save_document(&doc).await;
    assert!(!result.success);
    assert!(result.message.contains("saved locally"));

    assert_eq!(store.fetch_document().await, doc);
}

#[tokio::test]
async fn unconfigured_store_never_contacts_remote() {
    let fake = Shared::default();
    let base = spawn_fake(fake.clone()).await;

    let mut config = configured(&base);
    config.token.clear();
    let store = store(config, MemoryCache::new());

    let doc = vec![json!({"title": "a"})];
    assert!(store.save_document(&doc).await.success);
    assert_eq!(store.fetch_document().await, doc);
    assert!(matches!(
        store.test_connection().await,
        Err(StoreError::NotConfigured)
    ));

    assert_eq!(fake.lock().unwrap().requests, 0);
}

#[tokio::test]
async fn store_without_owner_never_contacts_remote() {
    let fake = Shared::default();
    let base = spawn_fake(fake.clone()).await;

    let mut config = configured(&base);
    config.owner.clear();
    let store = store(config, MemoryCache::new());

    let doc = vec![json!({"title": "a"})];
    assert!(store.save_document(&doc).await.success);
    assert_eq!(store.fetch_document().await, doc);
    assert!(matches!(
        store.test_connection().await,
        Err(StoreError::NotConfigured)
    ));

    assert_eq!(fake.lock().unwrap().requests, 0);
}

#[tokio::test]
async fn store_without_repo_never_contacts_remote() {
    let fake = Shared::default();
    let base = spawn_fake(fake.clone()).await;

    let mut config = configured(&base);
    config.repo.clear();
    let store = store(config, MemoryCache::new());

    let doc = vec![json!({"title": "a"})];
    assert!(store.save_document(&doc).await.success);
    assert_eq!(store.fetch_document().await, doc);
    assert!(matches!(
        store.test_connection().await,
        Err(StoreError::NotConfigured)
    ));

    assert_eq!(fake.lock().unwrap().requests, 0);
}

#[tokio::test]
async fn save_with_failing_cache_still_writes_remote() {
    let fake = Shared::default();
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), FailingCache);

    let doc = vec![json!({"title": "remote only"})];
    let result = store.save_document(&doc).await;
    assert!(result.success);
    assert!(result.message.contains("Articles saved to GitHub"));
    assert!(result.message.contains("local cache not updated"));

    let state = fake.lock().unwrap();
    assert_eq!(state.puts.len(), 1);
    assert_eq!(decoded(&state.puts[0]["content"]), json!(doc));
}

#[tokio::test]
async fn save_failure_with_failing_cache_reports_both() {
    let fake = Shared::default();
    fake.lock().unwrap().put_failure = Some((409, "is at abc but expected def".to_string()));
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), FailingCache);

    let result = store.save_document(&vec![json!({"title": "lost"})]).await;
    assert!(!result.success);
    assert!(result.message.contains("is at abc but expected def"));
    assert!(result.message.contains("local cache also failed"));
    assert!(!result.message.contains("saved locally"));
}

#[tokio::test]
async fn test_connection_rejects_non_json_repository() {
    let fake = Shared::default();
    fake.lock().unwrap().repo_garbage = true;
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), MemoryCache::new());

    match store.test_connection().await {
        Err(StoreError::Decode(message)) => {
            assert!(message.contains("unexpected repository response"));
        }
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_reports_repository() {
    let fake = Shared::default();
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), MemoryCache::new());

    let result = store.test_connection().await.unwrap();
    assert!(result.success);
    assert!(result.message.contains("fuwa/diary"));
    assert_eq!(result.repo.unwrap().full_name, "fuwa/diary");
}

#[tokio::test]
async fn test_connection_unauthorized() {
    let fake = Shared::default();
    fake.lock().unwrap().repo_status = Some(401);
    let base = spawn_fake(fake.clone()).await;
    let store = store(configured(&base), MemoryCache::new());

    match store.test_connection().await {
        Err(StoreError::Remote { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Bad credentials");
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_transport_failure() {
    let base = closed_port().await;
    let store = store(configured(&base), MemoryCache::new());

    assert!(matches!(
        store.test_connection().await,
        Err(StoreError::Transport(_))
    ));
}
