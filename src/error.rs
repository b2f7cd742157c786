//! HTTP-facing error type for the relay's REST surface.
//!
//! WebSocket-side failures are reported on the socket itself (see `ws.rs`)
//! or as a handshake status code; they do not go through `AppError`.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("session terminated")]
    Gone,

    #[error("server at capacity")]
    Capacity,

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64, remaining: u32 },

    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    message: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Gone => StatusCode::GONE,
            Self::Capacity => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let message = match &self {
            Self::Capacity => "Server at capacity".to_string(),
            _ => self.to_string(),
        };

        let body = Json(ErrorBody {
            error: ErrorDetail {
                message,
                code: status.as_u16(),
            },
        });

        let mut response = (status, body).into_response();

        if let Self::RateLimited {
            retry_after_secs,
            remaining,
        } = self
        {
            let headers = response.headers_mut();
            if let Ok(v) = retry_after_secs.to_string().parse() {
                headers.insert("Retry-After", v);
            }
            if let Ok(v) = remaining.to_string().parse() {
                headers.insert("X-RateLimit-Remaining", v);
            }
        }

        response
    }
}
