//! LINE Messaging API plumbing: webhook signature verification and the reply client.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, instrument};

use crate::error::DispatchError;
use crate::protocol::{ReplyMessage, ReplyRequest};

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// True when `signature` is the Base64 HMAC-SHA256 of `body` under `channel_secret`.
/// The comparison is constant time.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
  let Ok(expected) = STANDARD.decode(signature.trim()) else {
    return false;
  };
  let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes()) else {
    return false;
  };
  mac.update(body);
  mac.verify_slice(&expected).is_ok()
}

/// Sends one text reply addressed by a single-use reply token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplyDispatcher: Send + Sync {
  async fn send(&self, reply_token: &str, text: &str) -> Result<(), DispatchError>;
}

#[derive(Clone)]
pub struct LineMessaging {
  client: reqwest::Client,
  access_token: String,
  pub base_url: String,
}

impl LineMessaging {
  pub fn new(access_token: String, base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, access_token, base_url: base_url.trim_end_matches('/').to_string() })
  }
}

#[async_trait]
impl ReplyDispatcher for LineMessaging {
  #[instrument(level = "info", skip(self, reply_token, text), fields(text_len = text.len()))]
  async fn send(&self, reply_token: &str, text: &str) -> Result<(), DispatchError> {
    let url = format!("{}/v2/bot/message/reply", self.base_url);
    let req = ReplyRequest {
      reply_token: reply_token.to_string(),
      messages: vec![ReplyMessage::text(text)],
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "quiz-webhook/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_line_error(&body).unwrap_or(body);
      return Err(DispatchError::Status { status, message });
    }
    info!(target: "quiz_webhook", "Reply delivered");
    Ok(())
  }
}

/// LINE error bodies look like `{"message": "...", "details": [...]}`.
fn extract_line_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct LineError { message: String }
  serde_json::from_str::<LineError>(body).ok().map(|e| e.message)
}

#[cfg(test)]
pub(crate) fn sign(channel_secret: &str, body: &[u8]) -> String {
  let mut mac = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes()).unwrap();
  mac.update(body);
  STANDARD.encode(mac.finalize().into_bytes())
}
