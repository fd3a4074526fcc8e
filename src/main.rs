//! Quiz webhook: a LINE bot that serves multiple-choice questions from a bank and grades
//! A/B/C/D answers, explaining wrong ones with an OpenAI model.
//!
//! - Axum HTTP server, LINE webhook at `/callback`
//! - Flat-file quiz state (bank, cursor, latest question)
//! - Configuration from env / `.env`, optional TOML for prompts and replies
//!
//! Important env variables:
//!   OPENAI_API_KEY      : required
//!   LINE_CHANNEL_SECRET : required, authenticates webhooks
//!   LINE_ACCESS_TOKEN   : required, authorizes replies
//!   PORT                : u16 (default 5000)
//!   QUIZ_CONFIG_PATH    : path to TOML config (prompts + reply templates)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod bank;
mod config;
mod domain;
mod engine;
mod error;
mod line;
mod openai;
mod protocol;
mod routes;
mod state;
mod store;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Settings;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // A missing .env is normal in production.
  let dotenv = dotenvy::dotenv();
  telemetry::init_tracing();
  if let Err(e) = &dotenv {
    if !e.not_found() {
      warn!(target: "quiz_webhook", error = %e, "Ignoring unreadable .env file");
    }
  }

  // Fail fast on missing secrets, before the first request.
  let settings = Settings::from_env()?;
  settings.log_summary();

  let state = Arc::new(AppState::from_settings(&settings)?);
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "quiz_webhook", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quiz_webhook", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "quiz_webhook", error = %e, "Cannot listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "quiz_webhook", "Shutdown requested");
}
