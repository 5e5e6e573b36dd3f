//! End-to-end dispatcher tests over the demo dataset.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    routing::get,
    Router,
};
use orm_studio::{studio_routes, InMemoryDataset, InMemoryProvider, ProxyConfig, StudioConfig, StudioState};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn demo_config() -> StudioConfig {
    StudioConfig::new(Arc::new(InMemoryProvider::new(InMemoryDataset::demo())))
}

fn app(config: StudioConfig) -> Router {
    studio_routes(StudioState::new(config).unwrap())
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let req = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Method::GET, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn rows_are_paged() {
    let (status, body) = get_json(app(demo_config()), "/api/models/users/rows?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["offset"], 0);
}

#[tokio::test]
async fn search_is_case_insensitive_over_http() {
    let (_, upper) = get_json(app(demo_config()), "/api/models/users/rows?search=ADA").await;
    let (_, lower) = get_json(app(demo_config()), "/api/models/users/rows?search=ada").await;
    assert_eq!(upper["rows"], lower["rows"]);
    assert_eq!(upper["total"], 1);
    assert_eq!(upper["rows"][0]["email"], "ada@example.com");
}

#[tokio::test]
async fn offset_past_the_end_is_empty() {
    let (status, body) = get_json(app(demo_config()), "/api/models/users/rows?offset=10").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["rows"].as_array().unwrap().is_empty());
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn oversized_paging_values_saturate() {
    let (status, body) = get_json(app(demo_config()), "/api/models/users/rows?offset=5000000000").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["rows"].as_array().unwrap().is_empty());
    assert_eq!(body["total"], 3);
    assert_eq!(body["offset"], u32::MAX);

    let (status, body) = get_json(app(demo_config()), "/api/models/users/rows?limit=99999999999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_model_shape_is_not_found() {
    let (status, body) = get_json(app(demo_config()), "/api/models/ghosts/shape").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, serde_json::json!({ "ok": false, "error": "Model for table 'ghosts' not found" }));
}

#[tokio::test]
async fn shape_echoes_the_table_name() {
    let (status, body) = get_json(app(demo_config()), "/api/models/projects/shape/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tableName"], "projects");
    assert_eq!(body["relations"][0]["references"], "users.id");
}

#[tokio::test]
async fn schema_index_and_health() {
    let (status, body) = get_json(app(demo_config()), "/api/schema").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models"].as_array().unwrap().len(), 3);

    let (_, models) = get_json(app(demo_config()), "/api/models").await;
    assert_eq!(models, body);

    let (_, index) = get_json(app(demo_config()), "/api/").await;
    assert_eq!(index, serde_json::json!({ "ok": true, "message": "ORM Studio API" }));

    let (_, health) = get_json(app(demo_config()), "/api/health").await;
    assert_eq!(health, serde_json::json!({ "ok": true, "status": "healthy" }));
}

#[tokio::test]
async fn negative_limit_is_bad_request() {
    let (status, body) = get_json(app(demo_config()), "/api/models/users/rows?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Invalid limit. Expected a positive integer.");
}

#[tokio::test]
async fn unknown_route_under_prefix_is_not_found() {
    let (status, body) = get_json(app(demo_config()), "/api/models/users").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn preflight_is_no_content_with_cors() {
    let (status, headers, body) = send(app(demo_config()), Method::OPTIONS, "/anything").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET,OPTIONS");
}

#[tokio::test]
async fn writes_are_method_not_allowed() {
    let (status, headers, body) = send(app(demo_config()), Method::POST, "/api/models/users/rows").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn every_dispatcher_response_carries_cors() {
    for uri in ["/api/health", "/api/models/ghosts/rows", "/api/nope", "/elsewhere", "/apix"] {
        let (_, headers, _) = send(app(demo_config()), Method::GET, uri).await;
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN), "missing CORS on {}", uri);
    }
}

#[tokio::test]
async fn outside_prefix_without_proxy_is_not_found() {
    let (status, _, _) = send(app(demo_config()), Method::GET, "/apix/models").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_prefix_and_origin() {
    let config = demo_config()
        .with_api_prefix("studio/")
        .with_cors(orm_studio::CorsConfig {
            origin: Some("http://localhost:5173".into()),
            ..Default::default()
        });
    let (status, headers, _) = send(app(config), Method::GET, "/studio/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5173");
}

#[tokio::test]
async fn proxy_relays_upstream_status_and_body() {
    let upstream = Router::new()
        .route("/", get(|| async { "<html>studio ui</html>" }))
        .route("/missing", get(|| async { (StatusCode::IM_A_TEAPOT, "teapot") }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let config = demo_config().with_proxy(ProxyConfig {
        enabled: Some(true),
        origin: Some(origin),
    });

    let (status, _, body) = send(app(config.clone()), Method::GET, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<html>studio ui</html>");

    let (status, _, body) = send(app(config.clone()), Method::GET, "/missing?x=1").await;
    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body, b"teapot");

    // API paths are still served locally.
    let (status, _) = get_json(app(config), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unreachable_upstream_is_service_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let config = demo_config().with_proxy(ProxyConfig {
        enabled: Some(true),
        origin: Some(origin.clone()),
    });
    let (status, headers, body) = send(app(config), Method::GET, "/").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert!(String::from_utf8(body).unwrap().contains(&origin));
}
