//! Card proxy: send, delete, and per-user card history.
//!
//! Every send and delete outcome lands in the activity ledger. The send
//! record is written synchronously before the response so a later delete
//! can always recover the room context from it.

use super::auth::record_activity;
use super::{require_session, AppError, GatewayState};
use crate::ledger::{Activity, ActivityRecord};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

const DEFAULT_CARD_LIMIT: usize = 25;
const MAX_CARD_LIMIT: usize = 100;

/// Markdown shown by clients that cannot render the card attachment.
const CARD_FALLBACK_TEXT: &str = "Card could not render";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCardRequest {
    room_id: String,
    room_title: Option<String>,
    card: Value,
    #[serde(rename = "type")]
    type_tag: Option<String>,
}

#[derive(Deserialize)]
pub struct LimitParams {
    max: Option<usize>,
}

pub fn create_card_router(state: GatewayState) -> Router {
    Router::new()
        .route("/card", get(card_history).post(send_card))
        .route("/card/:id", delete(delete_card))
        .with_state(state)
}

/// POST /card
///
/// Proxies the card to Webex and records the outcome. Returns the upstream
/// payload on success, or 500 with the upstream failure message.
async fn send_card(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(request): Json<SendCardRequest>,
) -> Result<Json<Value>, AppError> {
    let session = require_session(&headers, &state)?;
    let email = &session.identity.email;

    let mut record = ActivityRecord::new(email, Activity::SendCard, false);
    record.room_id = Some(request.room_id.clone());
    record.room_title = request.room_title.clone();
    record.type_tag = request.type_tag.clone();

    match state
        .webex
        .send_message(
            &session.credential.access_token,
            &request.room_id,
            &request.card,
            CARD_FALLBACK_TEXT,
        )
        .await
    {
        Ok(sent) => {
            record.success = true;
            record.message_id = sent.id.clone();
            // Synchronous write: a later delete of this message looks the
            // record up by message id, so it must be durable before we
            // respond.
            record_activity(&state, record);

            info!(
                email = %email,
                room_id = %request.room_id,
                message_id = sent.id.as_deref().unwrap_or("<none>"),
                "Card sent"
            );
            Ok(Json(sent.payload))
        }
        Err(e) => {
            record_activity(&state, record);
            error!(email = %email, room_id = %request.room_id, error = %e, "Card send failed");
            Err(AppError::ServerError(e.to_string()))
        }
    }
}

/// DELETE /card/:id
///
/// The upstream call alone decides success or failure. The ledger lookup
/// that recovers the room context for the audit entry is best-effort: when
/// it finds nothing (or the store errors) the record is written with null
/// room fields, and the caller still gets the upstream outcome.
async fn delete_card(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> Result<Response, AppError> {
    let session = require_session(&headers, &state)?;
    let email = session.identity.email.clone();

    let outcome = state
        .webex
        .delete_message(&session.credential.access_token, &message_id)
        .await;

    let (room_id, room_title) = match state.ledger.find_sent_card(&email, &message_id) {
        Ok(Some(room)) => room,
        Ok(None) => {
            warn!(email = %email, message_id = %message_id, "No send record found for deleted message");
            (None, None)
        }
        Err(e) => {
            warn!(email = %email, message_id = %message_id, error = %e, "Send record lookup failed");
            (None, None)
        }
    };

    let mut record = ActivityRecord::new(&email, Activity::DeleteCard, outcome.is_ok());
    record.message_id = Some(message_id.clone());
    record.room_id = room_id;
    record.room_title = room_title;
    record_activity(&state, record);

    match outcome {
        Ok(()) => {
            info!(email = %email, message_id = %message_id, "Card deleted");
            Ok(().into_response())
        }
        Err(e) => {
            error!(email = %email, message_id = %message_id, error = %e, "Card delete failed");
            Err(AppError::ServerError(e.to_string()))
        }
    }
}

/// GET /card?max=N
///
/// Card sends and deletes for the session's email, newest first. A store
/// failure degrades to an empty list.
async fn card_history(
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
        .unwrap_or(DEFAULT_CARD_LIMIT)
        .clamp(1, MAX_CARD_LIMIT);

    match state.ledger.card_history(&session.identity.email, limit) {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            warn!(email = %session.identity.email, error = %e, "Card history query failed");
            Json(Vec::<crate::ledger::CardRecord>::new()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_card_request_deserialization() {
        let body = serde_json::json!({
            "roomId": "room-1",
            "roomTitle": "Planning",
            "card": {"type": "AdaptiveCard"},
            "type": "status"
        });

        let request: SendCardRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.room_id, "room-1");
        assert_eq!(request.room_title.as_deref(), Some("Planning"));
        assert_eq!(request.type_tag.as_deref(), Some("status"));
    }

    #[test]
    fn test_send_card_request_optional_fields() {
        let body = serde_json::json!({
            "roomId": "room-1",
            "card": {}
        });

        let request: SendCardRequest = serde_json::from_value(body).unwrap();
        assert!(request.room_title.is_none());
        assert!(request.type_tag.is_none());
    }
}
