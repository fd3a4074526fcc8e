//! Wire structs (serde ready): the LINE webhook payload, the LINE reply request, and the
//! small JSON bodies of the operational endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::Question;

//
// Inbound webhook
//

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// Only `message` events matter here; every other type is kept as `Other` so new
/// platform event types never fail the whole payload.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebhookEvent {
    Message {
        #[serde(rename = "replyToken", default)]
        reply_token: Option<String>,
        message: EventMessage,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventMessage {
    Text { text: String },
    #[serde(other)]
    Other,
}

//
// Outbound reply
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub reply_token: String,
    pub messages: Vec<ReplyMessage>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReplyMessage {
    Text { text: String },
}

impl ReplyMessage {
    pub fn text(text: &str) -> Self {
        ReplyMessage::Text { text: text.to_string() }
    }
}

//
// Operational endpoints
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOut {
    pub cursor: usize,
    pub bank_size: usize,
    pub active_question: Option<Question>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
