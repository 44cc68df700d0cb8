//! Session status, activity history and room listing.

use super::{require_session, GatewayState};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default and upper bound for ledger history queries.
const DEFAULT_HISTORY_LIMIT: usize = 25;
const MAX_HISTORY_LIMIT: usize = 100;

/// Default room listing bound (Webex caps a single page at 1000).
const DEFAULT_ROOMS_LIMIT: usize = 500;
const MAX_ROOMS_LIMIT: usize = 1000;

/// Identity summary returned by /details, /status and /bot.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    pub avatar_url: String,
    pub is_authenticated: bool,
    pub nick_name: String,
    pub is_bot: bool,
}

impl UserStatus {
    fn unauthenticated() -> Self {
        Self {
            avatar_url: String::new(),
            is_authenticated: false,
            nick_name: String::new(),
            is_bot: false,
        }
    }
}

#[derive(Deserialize)]
pub struct LimitParams {
    max: Option<usize>,
}

pub fn create_user_router(state: GatewayState) -> Router {
    Router::new()
        .route("/details", get(details))
        .route("/status", get(details))
        .route("/history", get(history))
        .route("/rooms", get(rooms))
        .with_state(state)
}

/// GET /details (alias /status)
///
/// Always 200. A missing, expired or partial session reports the
/// all-empty/false summary rather than an error, routing the front-end
/// back to the login entry point.
async fn details(State(state): State<GatewayState>, headers: HeaderMap) -> Json<UserStatus> {
    match require_session(&headers, &state) {
        Ok(session) => Json(UserStatus {
            avatar_url: session.identity.avatar.unwrap_or_default(),
            is_authenticated: true,
            nick_name: session.identity.nick_name.unwrap_or_default(),
            is_bot: session.credential.is_bot,
        }),
        Err(_) => Json(UserStatus::unauthenticated()),
    }
}

/// GET /history?max=N
///
/// Ledger activity for the session's email, newest first. A store failure
/// degrades to an empty list.
async fn history(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(params): Query<LimitParams>,
) -> Response {
    let session = match require_session(&headers, &state) {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    let limit = params
        .max
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    match state.ledger.recent(&session.identity.email, limit) {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            warn!(email = %session.identity.email, error = %e, "History query failed");
            Json(Vec::<crate::ledger::HistoryEntry>::new()).into_response()
        }
    }
}

/// GET /rooms?max=N
///
/// Always 200. The client already downgrades a twice-failed upstream call
/// to an empty list, so this handler never surfaces an upstream error.
async fn rooms(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(params): Query<LimitParams>,
) -> Response {
    let session = match require_session(&headers, &state) {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    let limit = params
        .max
        .unwrap_or(DEFAULT_ROOMS_LIMIT)
        .clamp(1, MAX_ROOMS_LIMIT);

    let mut rooms = state
        .webex
        .list_rooms(&session.credential.access_token, limit)
        .await;
    rooms.truncate(limit);

    Json(rooms).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_status_shape() {
        let json = serde_json::to_value(UserStatus::unauthenticated()).unwrap();
        assert_eq!(json["avatarUrl"], "");
        assert_eq!(json["isAuthenticated"], false);
        assert_eq!(json["nickName"], "");
        assert_eq!(json["isBot"], false);
    }

    #[test]
    fn test_limit_clamping() {
        assert_eq!(None.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT), 25);
        assert_eq!(Some(1000).unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT), 100);
        assert_eq!(Some(0).unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT), 1);
    }
}
