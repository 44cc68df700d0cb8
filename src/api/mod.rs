// HTTP API routers

pub mod auth;
pub mod card;
pub mod images;
pub mod system;
pub mod user;

pub use auth::create_auth_router;
pub use card::create_card_router;
pub use images::create_images_router;
pub use system::create_system_router;
pub use user::create_user_router;

use crate::config::GatewayConfig;
use crate::ledger::ActivityLedger;
use crate::session::{session_id_from_headers, Session, SessionStore};
use crate::webex::WebexClient;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// Shared application state for every router.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub webex: Arc<WebexClient>,
    pub sessions: Arc<SessionStore>,
    pub ledger: Arc<ActivityLedger>,
}

/// Error body for JSON endpoints.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Application error types for the JSON API surface.
pub enum AppError {
    /// Missing/expired session or invalid cookie. Fixed message, reveals
    /// nothing about which emails exist.
    Unauthorized,
    BadRequest(String),
    ServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "You are not authenticated.".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Resolve the caller's authenticated session from the request headers.
///
/// Fails with `Unauthorized` when the cookie is missing or tampered, the
/// session is unknown or expired, or the session is only partially
/// populated (no token, avatar or nickname) — partial sessions route the
/// caller back to login. A session-store failure is logged and also
/// reported as unauthenticated rather than leaking store details.
pub(crate) fn require_session(
    headers: &HeaderMap,
    state: &GatewayState,
) -> Result<Session, AppError> {
    let session_id = session_id_from_headers(headers, &state.config.cookie_secret)
        .ok_or(AppError::Unauthorized)?;

    match state.sessions.get(&session_id) {
        Ok(Some(session)) if session.is_authenticated() => Ok(session),
        Ok(_) => Err(AppError::Unauthorized),
        Err(e) => {
            error!(error = %e, "Session lookup failed");
            Err(AppError::Unauthorized)
        }
    }
}

/// Compose the complete gateway router.
pub fn create_gateway_router(state: GatewayState) -> Router {
    Router::new()
        .merge(create_auth_router(state.clone()))
        .merge(create_user_router(state.clone()))
        .merge(create_card_router(state.clone()))
        .merge(create_images_router(state.clone()))
        .merge(create_system_router(state))
}
