//! REST surface: session create/query, short-link landing, health/metrics,
//! and the manifest/logo compatibility endpoints.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::AppError;
use crate::pages;
use crate::session::{self, SessionMetadata};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    // Wallets that sandbox the relay as an iframe app fetch these cross-origin.
    let compat = Router::new()
        .route("/manifest.json", get(manifest))
        .route("/s/:id/manifest.json", get(manifest))
        .route("/demo/manifest.json", get(manifest))
        .route("/bridge/manifest.json", get(manifest))
        .route("/landing/manifest.json", get(manifest))
        .route("/logo.svg", get(logo))
        .layer(CorsLayer::new().allow_origin(Any));

    Router::new()
        .route("/session", axum::routing::post(create_session))
        .route("/session/:id", get(get_session))
        .route("/s/:id", get(short_link))
        .route("/landing", get(landing_page))
        .route("/bridge", get(bridge_page))
        .route("/demo", get(demo_page))
        .route("/", get(root_page))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(compat)
        .with_state(state)
}

fn client_ip(headers: &HeaderMap) -> String {
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }

    "unknown".to_string()
}

#[derive(Debug, Deserialize)]
struct CreateSessionBody {
    name: Option<String>,
    url: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    id: String,
    url: String,
    #[serde(rename = "expiresAt")]
    expires_at: i64,
}

async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    if state.sessions.is_at_capacity().await {
        return Err(AppError::Capacity);
    }

    let ip = client_ip(&headers);
    if !state.rate_limiter.check(&ip).await {
        let info = state.rate_limiter.info(&ip).await;
        let retry_after_secs = ((info.reset_at_ms - session::now_ms()).max(0) as f64 / 1000.0)
            .ceil() as u64;
        return Err(AppError::RateLimited {
            retry_after_secs,
            remaining: info.remaining,
        });
    }

    let metadata = parse_metadata(&body);

    let session = state
        .sessions
        .create(metadata)
        .await
        .ok_or(AppError::Capacity)?;

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let url = format!("{proto}://{host}/s/{}?k={}", session.id, session.secret);

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            id: session.id,
            url,
            expires_at: session.expires_at_ms,
        }),
    ))
}

/// Only recognize `{name, url, icon?}` if both `name` and `url` are present;
/// any other body (empty, malformed, or missing fields) yields no metadata.
fn parse_metadata(body: &[u8]) -> Option<SessionMetadata> {
    if body.is_empty() {
        return None;
    }
    let parsed: CreateSessionBody = serde_json::from_slice(body).ok()?;
    match (parsed.name, parsed.url) {
        (Some(name), Some(url)) => Some(SessionMetadata {
            name,
            url,
            icon: parsed.icon,
        }),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    id: String,
    status: session::SessionStatus,
    metadata: Option<SessionMetadata>,
    #[serde(rename = "expiresAt")]
    expires_at: i64,
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = state.sessions.get(&id).await.ok_or(AppError::NotFound)?;
    if session.terminated {
        return Err(AppError::Gone);
    }

    Ok(Json(SessionSummary {
        id: session.id,
        status: session.status,
        metadata: session.metadata,
        expires_at: session.expires_at_ms,
    }))
}

#[derive(Debug, Deserialize)]
struct ShortLinkQuery {
    k: Option<String>,
    #[allow(dead_code)]
    lang: Option<String>,
    #[allow(dead_code)]
    theme: Option<String>,
}

async fn short_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ShortLinkQuery>,
) -> Result<Html<String>, AppError> {
    state.sessions.get(&id).await.ok_or(AppError::NotFound)?;
    Ok(Html(pages::landing_for_session(&id, query.k.as_deref())))
}

async fn landing_page() -> Html<&'static str> {
    Html(pages::landing())
}

#[derive(Debug, Deserialize)]
struct BridgeQuery {
    session: Option<String>,
}

async fn bridge_page(Query(query): Query<BridgeQuery>) -> Result<Html<String>, AppError> {
    let session = query
        .session
        .ok_or_else(|| AppError::BadRequest("session query parameter is required".to_string()))?;
    Ok(Html(pages::bridge(&session)))
}

async fn demo_page() -> Html<&'static str> {
    Html(pages::demo())
}

async fn root_page() -> Html<&'static str> {
    Html(pages::root())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime: u64,
    sessions: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.sessions.stats().await;
    Json(HealthResponse {
        status: "ok",
        uptime: stats.uptime,
        sessions: stats.total_sessions,
    })
}

async fn metrics(State(state): State<AppState>) -> Json<session::Stats> {
    Json(state.sessions.stats().await)
}

#[derive(Debug, Serialize)]
struct Manifest {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "iconPath")]
    icon_path: String,
}

async fn manifest(headers: HeaderMap) -> Response {
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    let body = Manifest {
        name: "DApp Relay",
        description: "Pairs a DApp with a mobile wallet acting as a remote signer",
        icon_path: format!("{proto}://{host}/logo.svg"),
    };

    Json(body).into_response()
}

async fn logo() -> Response {
    let mut response = pages::LOGO_SVG.into_response();
    let headers = response.headers_mut();
    headers.insert(
        "Content-Type",
        HeaderValue::from_static("image/svg+xml"),
    );
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("public, max-age=86400"),
    );
    response
}

/// Background task that sweeps expired sessions every interval.
pub async fn sweep_task(sessions: std::sync::Arc<crate::session::SessionStore>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let removed = sessions.cleanup_expired().await;
        if removed > 0 {
            tracing::info!(removed, "swept expired sessions");
        }
    }
}
