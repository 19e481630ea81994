use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use line_by_line_core::InMemoryRecordStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub fn create_test_app() -> (Router, Arc<InMemoryRecordStore>) {
    let config = Config::from_lookup(|_| None).unwrap();
    let store = Arc::new(InMemoryRecordStore::new());
    let app_state = Arc::new(AppState {
        store: store.clone(),
        config: Arc::new(config),
    });
    (web::router(app_state), store)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}
