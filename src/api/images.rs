//! Image upload history.
//!
//! The upload itself goes to object storage outside this service; the
//! ledger keeps the per-user trail of `upload image` records, and this
//! router exposes it.

use super::{require_session, GatewayState};
use crate::ledger::ImageRecord;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::error;

const DEFAULT_IMAGES_LIMIT: usize = 25;
const MAX_IMAGES_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct LimitParams {
    max: Option<usize>,
}

pub fn create_images_router(state: GatewayState) -> Router {
    Router::new()
        .route("/images", get(image_history))
        .with_state(state)
}

/// GET /images?max=N
async fn image_history(
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
        .unwrap_or(DEFAULT_IMAGES_LIMIT)
        .clamp(1, MAX_IMAGES_LIMIT);

    match state.ledger.image_history(&session.identity.email, limit) {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            error!(email = %session.identity.email, error = %e, "Image history query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Vec::<ImageRecord>::new()),
            )
                .into_response()
        }
    }
}
