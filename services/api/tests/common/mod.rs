//! Shared setup for the HTTP-level tests: an app wired to the in-memory store,
//! the static retriever and a fake web searcher.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use lesson_deck_api::{
    adapters::{InMemoryStore, PlainTextConverter, StaticRetriever},
    config::Config,
    web::{build_router, state::AppState},
    workflow::{SessionWorkflow, WorkflowPorts},
};
use lesson_deck_core::domain::WebSearchHit;
use lesson_deck_core::ports::{PortResult, SessionStore, WebSearcher};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub struct CannedSearcher;

#[async_trait]
impl WebSearcher for CannedSearcher {
    async fn search(&self, query: &str) -> PortResult<Vec<WebSearchHit>> {
        Ok(vec![WebSearchHit {
            title: format!("{query} overview"),
            content: format!("Everything about {query}."),
            url: "https://example.org/overview".to_string(),
            snippet: format!("A short take on {query}."),
        }])
    }
}

pub fn test_config() -> Config {
    let data_dir = std::env::temp_dir().join(format!("lesson-deck-it-{}", Uuid::new_v4()));
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "memory".to_string()),
        ("DESIGN_CHUNK_DELAY_MS", "0".to_string()),
        ("APP_DATA_DIRECTORY", data_dir.to_string_lossy().into_owned()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub fn test_app() -> Router {
    test_app_with_store(Arc::new(InMemoryStore::new()))
}

pub fn test_app_with_store(store: Arc<dyn SessionStore>) -> Router {
    let config = Arc::new(test_config());
    let workflow = Arc::new(SessionWorkflow::new(
        WorkflowPorts {
            store,
            retriever: Arc::new(StaticRetriever::new()),
            searcher: Arc::new(CannedSearcher),
            converter: Arc::new(PlainTextConverter::new()),
        },
        config.backfill,
        config.uploads_dir(),
    ));
    build_router(Arc::new(AppState::new(workflow, config)))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

pub async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let (status, bytes) = send(app, request).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, uri, Some(body)).await
}

/// Opens a session for `user` and returns its id.
pub async fn init_session(app: &Router, user: &str, query: &str, web_search: bool) -> String {
    let (status, body) = post(
        app,
        "/api/v1/edu/generate/init",
        serde_json::json!({
            "userId": user,
            "userInput": query,
            "config": {"pages": 5, "classType": "新授课", "kbIds": ["kb1"], "webSearch": web_search},
            "files": []
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0, "{body}");
    body["data"]["sessionId"].as_str().unwrap().to_string()
}
