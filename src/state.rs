//! Application state shared by every request.
//!
//! This module owns:
//!   - the quiz engine (which owns the file-backed store)
//!   - the reply dispatcher
//!   - the channel secret used to authenticate webhooks

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::Settings;
use crate::engine::QuizEngine;
use crate::line::{LineMessaging, ReplyDispatcher};
use crate::openai::OpenAI;
use crate::store::QuizStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QuizEngine>,
    pub dispatcher: Arc<dyn ReplyDispatcher>,
    pub channel_secret: String,
}

impl AppState {
    pub fn new(engine: Arc<QuizEngine>, dispatcher: Arc<dyn ReplyDispatcher>, channel_secret: String) -> Self {
        Self { engine, dispatcher, channel_secret }
    }

    /// Wire the production collaborators from settings.
    #[instrument(level = "info", skip_all)]
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let openai = OpenAI::new(
            settings.openai_api_key.clone(),
            settings.openai_base_url.clone(),
            settings.openai_model.clone(),
            settings.quiz.prompts.clone(),
            settings.http_timeout,
        )?;
        info!(target: "quiz_webhook", base_url = %openai.base_url, model = %openai.model, "OpenAI explanation generator ready");

        let line = LineMessaging::new(
            settings.line_access_token.clone(),
            settings.line_api_base_url.clone(),
            settings.http_timeout,
        )?;
        info!(target: "quiz_webhook", base_url = %line.base_url, "LINE reply client ready");

        let store = Arc::new(QuizStore::new(settings.store.clone()));
        let engine = QuizEngine::new(
            store,
            Arc::new(openai),
            settings.quiz.replies.clone(),
            settings.trigger_keyword.clone(),
        );

        Ok(Self::new(Arc::new(engine), Arc::new(line), settings.line_channel_secret.clone()))
    }
}
