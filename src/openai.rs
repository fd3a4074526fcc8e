//! Explanation Generator: a minimal OpenAI chat.completions client.
//!
//! One plain-text completion per wrong answer. Calls are instrumented and log the model,
//! latency and token usage, never the API key or the prompt contents.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::Letter;
use crate::error::ExplainError;
use crate::util::fill_template;

/// Produces the text shown to a user who picked the wrong letter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
  async fn explain(&self, question: &str, chosen: Letter, correct: Letter) -> Result<String, ExplainError>;
}

#[derive(Clone)]
pub struct OpenAI {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  prompts: Prompts,
}

impl OpenAI {
  pub fn new(
    api_key: String,
    base_url: String,
    model: String,
    prompts: Prompts,
    timeout: Duration,
  ) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model, prompts })
  }

  /// Plain-text chat completion: first choice, trimmed.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_plain(&self, system: &str, user: &str, temperature: f32) -> Result<String, ExplainError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "quiz-webhook/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(ExplainError::Status { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    first_choice_text(body).ok_or(ExplainError::Empty)
  }
}

#[async_trait]
impl ExplanationGenerator for OpenAI {
  #[instrument(level = "info", skip(self, question), fields(question_len = question.len(), %chosen, %correct))]
  async fn explain(&self, question: &str, chosen: Letter, correct: Letter) -> Result<String, ExplainError> {
    let user = fill_template(
      &self.prompts.explain_user_template,
      &[("question", question), ("chosen", chosen.as_str()), ("correct", correct.as_str())],
    );
    let start = Instant::now();
    let result = self.chat_plain(&self.prompts.explain_system, &user, 0.3).await;
    let elapsed = start.elapsed();
    match &result {
      Ok(text) => info!(?elapsed, len = text.len(), "Explanation received"),
      Err(e) => error!(?elapsed, error = %e, "Explanation request failed"),
    }
    result
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

fn first_choice_text(body: ChatCompletionResponse) -> Option<String> {
  body.choices.into_iter().next()
    .and_then(|c| c.message.content)
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
