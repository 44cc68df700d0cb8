//! Aggregate usage statistics.

use super::GatewayState;
use crate::ledger::SendStats;
use axum::{extract::State, response::Json, routing::get, Router};
use tracing::warn;

pub fn create_system_router(state: GatewayState) -> Router {
    Router::new()
        .route("/system", get(system_stats))
        .with_state(state)
}

/// GET /system
///
/// Unauthenticated. Always 200: a store failure degrades to zeroed stats
/// rather than an error body.
async fn system_stats(State(state): State<GatewayState>) -> Json<SendStats> {
    match state.ledger.send_stats() {
        Ok(stats) => Json(stats),
        Err(e) => {
            warn!(error = %e, "Stats query failed, returning zeroed fallback");
            Json(SendStats::zero())
        }
    }
}
