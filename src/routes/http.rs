//! Operational endpoints: liveness and a read-only view of the quiz state.

use std::sync::Arc;
use axum::{extract::State, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{instrument, warn};

use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_status(State(state): State<Arc<AppState>>) -> Response {
  match state.engine.store().snapshot().await {
    Ok(snap) => Json(StatusOut {
      cursor: snap.cursor,
      bank_size: snap.bank_size,
      active_question: snap.active,
    }).into_response(),
    Err(e) => {
      warn!(target: "quiz_webhook", error = %e, "Status snapshot failed");
      (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorOut { error: e.to_string() })).into_response()
    }
  }
}
