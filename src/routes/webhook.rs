//! The platform webhook. Authenticates the raw body, then answers each text message event
//! with exactly one reply. Reply delivery failures are logged and swallowed.

use std::sync::Arc;

use axum::{
  body::Bytes,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
};
use tracing::{debug, error, info, instrument, warn};

use crate::line::{verify_signature, SIGNATURE_HEADER};
use crate::protocol::{EventMessage, WebhookBody, WebhookEvent};
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info", skip_all, fields(body_len = body.len()))]
pub async fn callback(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
  let signature = headers
    .get(SIGNATURE_HEADER)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default();
  if !verify_signature(&state.channel_secret, &body, signature) {
    warn!(target: "quiz_webhook", has_signature = !signature.is_empty(), "Webhook signature rejected");
    return StatusCode::BAD_REQUEST.into_response();
  }

  let payload: WebhookBody = match serde_json::from_slice(&body) {
    Ok(p) => p,
    Err(e) => {
      warn!(target: "quiz_webhook", error = %e, body = %trunc_for_log(&String::from_utf8_lossy(&body), 200), "Webhook body is not valid JSON");
      return StatusCode::BAD_REQUEST.into_response();
    }
  };

  info!(target: "quiz_webhook", events = payload.events.len(), "Webhook received");
  for event in payload.events {
    handle_event(&state, event).await;
  }
  (StatusCode::OK, "OK").into_response()
}

async fn handle_event(state: &AppState, event: WebhookEvent) {
  let (reply_token, text) = match event {
    WebhookEvent::Message { reply_token: Some(token), message: EventMessage::Text { text } } => (token, text),
    WebhookEvent::Message { reply_token: None, .. } => {
      debug!(target: "quiz_webhook", "Message event without reply token; skipping");
      return;
    }
    WebhookEvent::Message { message: EventMessage::Other, .. } => {
      debug!(target: "quiz_webhook", "Non-text message; skipping");
      return;
    }
    WebhookEvent::Other => {
      debug!(target: "quiz_webhook", "Non-message event; skipping");
      return;
    }
  };

  let reply = state.engine.handle_incoming_text(&text).await;
  if let Err(e) = state.dispatcher.send(&reply_token, &reply).await {
    error!(target: "quiz_webhook", error = %e, "Reply failed; not retried");
  }
}
