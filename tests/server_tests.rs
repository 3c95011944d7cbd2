//! Router-level tests: requests go through the full axum stack

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use std::{
    fs,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tower::ServiceExt;
use webserver::{
    config::Config,
    context::{HTML_CONTENT_TYPE, REQUEST_ID_HEADER},
    handlers::AppState,
    render::ViewRenderer,
    server::create_router,
    snowflake::{IdError, IdGenerator, Snowflake, DEFAULT_EPOCH_MS},
};

/// Hands out 1, 2, 3, ...
struct CountingIds(AtomicU64);

impl IdGenerator for CountingIds {
    fn next_id(&self) -> Result<u64, IdError> {
        Ok(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

struct BrokenIds;

impl IdGenerator for BrokenIds {
    fn next_id(&self) -> Result<u64, IdError> {
        Err(IdError::ClockMovedBackwards {
            last_ms: 10,
            now_ms: 5,
        })
    }
}

fn views() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<p>index {{ requestID }}</p>").unwrap();
    fs::write(dir.path().join("hello.html"), "<p>Hello, {{ name }}!</p>").unwrap();
    dir
}

fn app(ids: Arc<dyn IdGenerator>, views: &tempfile::TempDir, config: &Config) -> Router {
    let renderer = Arc::new(ViewRenderer::new(views.path(), "html", false));
    let state = AppState::new(ids, renderer, config);

    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    create_router(state, Arc::new(recorder.handle()))
}

async fn body_of(response: axum::response::Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

#[tokio::test]
async fn test_index_renders_view_with_request_id() {
    let views = views();
    let app = app(
        Arc::new(CountingIds(AtomicU64::new(0))),
        &views,
        &Config::default(),
    );

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        HTML_CONTENT_TYPE
    );
    assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "1");
    assert_eq!(&body_of(response).await[..], b"<p>index 1</p>");
}

#[tokio::test]
async fn test_route_params_reach_the_view_escaped() {
    let views = views();
    let app = app(
        Arc::new(CountingIds(AtomicU64::new(0))),
        &views,
        &Config::default(),
    );

    let response = app
        .oneshot(
            Request::get("/hello/%3Cb%3Eada%3C%2Fb%3E")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_of(response).await.to_vec()).unwrap();
    assert!(body.starts_with("<p>Hello, &lt;b&gt;ada&lt;"));
    assert!(!body.contains("<b>"));
}

#[tokio::test]
async fn test_each_request_gets_a_distinct_id() {
    let views = views();
    let ids = Arc::new(Snowflake::new(9, DEFAULT_EPOCH_MS).unwrap());
    let app = app(ids, &views, &Config::default());

    let mut seen = Vec::new();
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(Request::get("/hello/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id: u64 = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_ne!(id, 0);
        assert!(!seen.contains(&id));
        seen.push(id);
    }
}

#[tokio::test]
async fn test_missing_view_is_not_found() {
    let views = tempfile::tempdir().unwrap();
    let app = app(
        Arc::new(CountingIds(AtomicU64::new(0))),
        &views,
        &Config::default(),
    );

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "1");
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
    assert_eq!(body["error"]["type"], "view_not_found");
}

#[tokio::test]
async fn test_id_failure_rejects_request() {
    let views = views();
    let app = app(Arc::new(BrokenIds), &views, &Config::default());

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.headers().get(REQUEST_ID_HEADER).is_none());
    let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
    assert_eq!(body["error"]["type"], "id_generation_error");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let views = views();
    let mut config = Config::default();
    config.server.body_limit_bytes = 16;
    let app = app(Arc::new(CountingIds(AtomicU64::new(0))), &views, &config);

    let response = app
        .oneshot(
            Request::get("/")
                .header(header::CONTENT_LENGTH, "64")
                .body(Body::from(vec![b'a'; 64]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_oversized_body_without_content_length_is_rejected() {
    let views = views();
    let mut config = Config::default();
    config.server.body_limit_bytes = 16;
    let app = app(Arc::new(CountingIds(AtomicU64::new(0))), &views, &config);

    let request = Request::post("/")
        .body(Body::from(vec![b'a'; 64]))
        .unwrap();
    assert!(request.headers().get(header::CONTENT_LENGTH).is_none());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_health_and_metrics_endpoints() {
    let views = views();
    let app = app(
        Arc::new(CountingIds(AtomicU64::new(0))),
        &views,
        &Config::default(),
    );

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
    assert_eq!(body["status"], "healthy");

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
