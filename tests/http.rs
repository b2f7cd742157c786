//! Integration tests over the HTTP surface, exercised through the router
//! directly rather than a bound socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use dapp_relay::config::Config;
use dapp_relay::state::AppState;

fn test_state() -> AppState {
    AppState::new(Config {
        port: 0,
        host: "127.0.0.1".to_string(),
        max_sessions: 10_000,
        config_dir: "./config".into(),
    })
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_session_returns_id_url_and_expiry() {
    let app = dapp_relay::app(test_state());

    let request = Request::builder()
        .method("POST")
        .uri("/session")
        .header("host", "relay.example")
        .body(Body::from(
            serde_json::json!({"name": "My DApp", "url": "https://d.example"}).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;

    let id = body["id"].as_str().unwrap();
    assert_eq!(id.chars().count(), 4);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("http://relay.example/s/"));
    assert!(url.contains("?k="));
    assert!(body["expiresAt"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn get_unknown_session_is_404() {
    let app = dapp_relay::app(test_state());

    let request = Request::builder()
        .uri("/session/ZZZZ")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_session_omits_secret() {
    let state = test_state();
    let app = dapp_relay::app(state.clone());

    let session = state.sessions.create(None).await.unwrap();

    let request = Request::builder()
        .uri(format!("/session/{}", session.id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], session.id);
    assert_eq!(body["status"], "pending");
    assert!(body.get("secret").is_none());
}

#[tokio::test]
async fn short_link_for_unknown_session_is_404() {
    let app = dapp_relay::app(test_state());

    let request = Request::builder()
        .uri("/s/ZZZZ")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bridge_without_session_param_is_400() {
    let app = dapp_relay::app(test_state());

    let request = Request::builder()
        .uri("/bridge")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn capacity_exhausted_returns_503() {
    let state = test_state();
    for _ in 0..state.config.max_sessions {
        // Bypass the rate limiter by creating directly through the store.
        state.sessions.create(None).await.unwrap();
    }
    let app = dapp_relay::app(state);

    let request = Request::builder()
        .method("POST")
        .uri("/session")
        .header("host", "relay.example")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn rate_limit_rejects_eleventh_request_from_same_ip() {
    let app = dapp_relay::app(test_state());

    for i in 0..10 {
        let request = Request::builder()
            .method("POST")
            .uri("/session")
            .header("host", "relay.example")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "request {i} should be admitted"
        );
    }

    let request = Request::builder()
        .method("POST")
        .uri("/session")
        .header("host", "relay.example")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_some());
    assert_eq!(
        response
            .headers()
            .get("x-ratelimit-remaining")
            .unwrap()
            .to_str()
            .unwrap(),
        "0"
    );
}

#[tokio::test]
async fn health_and_metrics_report_stats() {
    let app = dapp_relay::app(test_state());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalSessions"], 0);
}

#[tokio::test]
async fn manifest_has_permissive_cors() {
    let app = dapp_relay::app(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/manifest.json")
                .header("host", "relay.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn logo_is_served_as_svg_with_cors_and_cache_headers() {
    let app = dapp_relay::app(test_state());

    let response = app
        .oneshot(Request::builder().uri("/logo.svg").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/svg+xml");
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=86400"
    );
}
