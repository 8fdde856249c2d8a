//! The plain-HTTP side of the server: a banner, server-side code issuance
//! for clients that prefer not to invent their own, and a health snapshot.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::AppState;

/// `GET /`: a human-readable banner.
pub async fn banner() -> &'static str {
    "tincan signaling server"
}

/// `GET /generate-code`: registers a fresh room and returns its code as
/// plain text. Exhaustion maps to 503.
pub async fn generate_code(State(app): State<AppState>) -> impl IntoResponse {
    match app.coordinator.generate_code().await {
        Ok(code) => (StatusCode::OK, code.to_string()),
        Err(error) => (StatusCode::SERVICE_UNAVAILABLE, error.to_string()),
    }
}

/// `GET /healthz`: live session and room counters.
pub async fn healthz(State(app): State<AppState>) -> impl IntoResponse {
    match app.coordinator.snapshot().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(error) => {
            (StatusCode::SERVICE_UNAVAILABLE, error.to_string()).into_response()
        }
    }
}
