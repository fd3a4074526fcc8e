//! Startup configuration: environment settings plus an optional TOML file of prompts and
//! reply templates.
//!
//! Required env (startup fails without them):
//!   OPENAI_API_KEY, LINE_CHANNEL_SECRET, LINE_ACCESS_TOKEN
//! Optional env:
//!   PORT, OPENAI_BASE_URL, OPENAI_MODEL, LINE_API_BASE_URL, HTTP_TIMEOUT_SECS,
//!   QUIZ_BANK_PATH, QUIZ_CURSOR_PATH, QUIZ_ACTIVE_PATH, QUIZ_TRIGGER_KEYWORD, QUIZ_CONFIG_PATH

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::engine::normalize_input;
use crate::error::ConfigError;
use crate::store::StorePaths;

#[derive(Clone)]
pub struct Settings {
  pub port: u16,
  pub openai_api_key: String,
  pub openai_base_url: String,
  pub openai_model: String,
  pub line_channel_secret: String,
  pub line_access_token: String,
  pub line_api_base_url: String,
  pub http_timeout: Duration,
  pub store: StorePaths,
  pub trigger_keyword: String,
  pub quiz: QuizConfig,
}

impl Settings {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build settings from any key lookup. Empty values count as missing.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
    let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

    let openai_api_key = required("OPENAI_API_KEY")?;
    let line_channel_secret = required("LINE_CHANNEL_SECRET")?;
    let line_access_token = required("LINE_ACCESS_TOKEN")?;

    let port = parse_or("PORT", get("PORT"), 5000u16)?;
    let timeout_secs = parse_or("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), 20u64)?;
    if timeout_secs == 0 {
      return Err(ConfigError::Invalid { key: "HTTP_TIMEOUT_SECS", reason: "must be at least 1".into() });
    }

    let trigger_keyword = normalize_input(&or_default("QUIZ_TRIGGER_KEYWORD", "NEXT"));
    if trigger_keyword.is_empty() || ["A", "B", "C", "D"].contains(&trigger_keyword.as_str()) {
      return Err(ConfigError::Invalid {
        key: "QUIZ_TRIGGER_KEYWORD",
        reason: format!("{trigger_keyword:?} collides with an answer letter"),
      });
    }

    let quiz = match get("QUIZ_CONFIG_PATH") {
      Some(path) => QuizConfig::load(PathBuf::from(path))?,
      None => QuizConfig::default(),
    };

    Ok(Self {
      port,
      openai_api_key,
      openai_base_url: or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
      openai_model: or_default("OPENAI_MODEL", "gpt-4"),
      line_channel_secret,
      line_access_token,
      line_api_base_url: or_default("LINE_API_BASE_URL", "https://api.line.me"),
      http_timeout: Duration::from_secs(timeout_secs),
      store: StorePaths {
        bank: or_default("QUIZ_BANK_PATH", "question_bank.txt").into(),
        cursor: or_default("QUIZ_CURSOR_PATH", "bank_cursor.txt").into(),
        active: or_default("QUIZ_ACTIVE_PATH", "latest_question.txt").into(),
      },
      trigger_keyword,
      quiz,
    })
  }

  /// Log which secrets are present. Values are never logged.
  pub fn log_summary(&self) {
    let mark = |v: &str| if v.is_empty() { "missing" } else { "set" };
    info!(
      target: "quiz_webhook",
      openai_api_key = mark(&self.openai_api_key),
      line_channel_secret = mark(&self.line_channel_secret),
      line_access_token = mark(&self.line_access_token),
      model = %self.openai_model,
      bank = %self.store.bank.display(),
      trigger = %self.trigger_keyword,
      "Configuration loaded"
    );
  }
}

/// Secrets are redacted so settings can be logged safely.
impl std::fmt::Debug for Settings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Settings")
      .field("port", &self.port)
      .field("openai_api_key", &"<redacted>")
      .field("openai_base_url", &self.openai_base_url)
      .field("openai_model", &self.openai_model)
      .field("line_channel_secret", &"<redacted>")
      .field("line_access_token", &"<redacted>")
      .field("line_api_base_url", &self.line_api_base_url)
      .field("http_timeout", &self.http_timeout)
      .field("store", &self.store)
      .field("trigger_keyword", &self.trigger_keyword)
      .field("quiz", &self.quiz)
      .finish()
  }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(s) => s.trim().parse::<T>().map_err(|e| ConfigError::Invalid { key, reason: e.to_string() }),
  }
}

/// Contents of the optional TOML file.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub replies: Replies,
}

impl QuizConfig {
  pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path: path.clone(), source })?;
    let cfg = toml::from_str::<QuizConfig>(&raw).map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
    info!(target: "quiz_webhook", path = %path.display(), "Loaded quiz config (TOML)");
    Ok(cfg)
  }
}

/// Prompts for the explanation model. `{question}`, `{chosen}` and `{correct}` are filled in.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub explain_system: String,
  pub explain_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      explain_system: "You are an expert quiz explainer who is great at walking students through multiple-choice questions.".into(),
      explain_user_template: "Question: {question}\nThe student chose {chosen}, but the correct answer is {correct}. Explain why.".into(),
    }
  }
}

/// User-facing reply templates.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Replies {
  pub invalid_input: String,
  pub no_active_question: String,
  pub question_served: String,
  pub bank_exhausted: String,
  pub correct: String,
  pub incorrect: String,
  pub incorrect_no_explanation: String,
  pub storage_error: String,
}

impl Default for Replies {
  fn default() -> Self {
    Self {
      invalid_input: "Please answer with A, B, C or D (or send {keyword} for a new question).".into(),
      no_active_question: "⚠️ There is no question to answer yet. Send {keyword} to get one!".into(),
      question_served: "📝 Question {position}/{total}:\n{question}".into(),
      bank_exhausted: "🏁 You have answered every question in the bank. Well done!".into(),
      correct: "✅ Correct! The answer is {correct}. Well done!".into(),
      incorrect: "❌ Not quite… the correct answer is {correct}.\nExplanation: {explanation}".into(),
      incorrect_no_explanation: "❌ Not quite… the correct answer is {correct}.\n⚠️ Explanation unavailable right now.".into(),
      storage_error: "❌ Could not load or save the question: {error}".into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k: &str| map.get(k).cloned()
  }

  const SECRETS: [(&str, &str); 3] = [
    ("OPENAI_API_KEY", "sk-test"),
    ("LINE_CHANNEL_SECRET", "secret"),
    ("LINE_ACCESS_TOKEN", "token"),
  ];

  #[test]
  fn defaults_apply_when_only_secrets_are_set() {
    let s = Settings::from_lookup(lookup(&SECRETS)).unwrap();
    assert_eq!(s.port, 5000);
    assert_eq!(s.openai_model, "gpt-4");
    assert_eq!(s.trigger_keyword, "NEXT");
    assert_eq!(s.http_timeout, Duration::from_secs(20));
    assert_eq!(s.store.active, PathBuf::from("latest_question.txt"));
  }

  #[test]
  fn debug_output_redacts_secrets() {
    let s = Settings::from_lookup(lookup(&SECRETS)).unwrap();
    let shown = format!("{s:?}");
    assert!(shown.contains("<redacted>"));
    for (_, secret) in SECRETS {
      assert!(!shown.contains(secret), "{secret} leaked into Debug output");
    }
    assert!(shown.contains("gpt-4"));
  }

  #[test]
  fn each_missing_secret_fails_fast() {
    for skip in ["OPENAI_API_KEY", "LINE_CHANNEL_SECRET", "LINE_ACCESS_TOKEN"] {
      let pairs: Vec<_> = SECRETS.iter().copied().filter(|(k, _)| *k != skip).collect();
      match Settings::from_lookup(lookup(&pairs)) {
        Err(ConfigError::Missing(key)) => assert_eq!(key, skip),
        other => panic!("expected Missing({skip}), got {other:?}"),
      }
    }
  }

  #[test]
  fn blank_secret_counts_as_missing() {
    let mut pairs = SECRETS.to_vec();
    pairs[1] = ("LINE_CHANNEL_SECRET", "   ");
    assert!(matches!(Settings::from_lookup(lookup(&pairs)), Err(ConfigError::Missing("LINE_CHANNEL_SECRET"))));
  }

  #[test]
  fn trigger_keyword_is_normalized_and_may_not_be_a_letter() {
    let mut pairs = SECRETS.to_vec();
    pairs.push(("QUIZ_TRIGGER_KEYWORD", "  quiz me "));
    assert_eq!(Settings::from_lookup(lookup(&pairs)).unwrap().trigger_keyword, "QUIZ ME");

    pairs.pop();
    pairs.push(("QUIZ_TRIGGER_KEYWORD", "b"));
    assert!(matches!(
      Settings::from_lookup(lookup(&pairs)),
      Err(ConfigError::Invalid { key: "QUIZ_TRIGGER_KEYWORD", .. })
    ));
  }

  #[test]
  fn bad_port_is_invalid() {
    let mut pairs = SECRETS.to_vec();
    pairs.push(("PORT", "eighty"));
    assert!(matches!(Settings::from_lookup(lookup(&pairs)), Err(ConfigError::Invalid { key: "PORT", .. })));
  }

  #[test]
  fn toml_overrides_only_given_fields() {
    let cfg: QuizConfig = toml::from_str(
      r#"
        [replies]
        correct = "Right! {correct}"

        [prompts]
        explain_system = "You are a middle-school English teacher."
      "#,
    )
    .unwrap();
    assert_eq!(cfg.replies.correct, "Right! {correct}");
    assert_eq!(cfg.replies.bank_exhausted, Replies::default().bank_exhausted);
    assert_eq!(cfg.prompts.explain_system, "You are a middle-school English teacher.");
    assert_eq!(cfg.prompts.explain_user_template, Prompts::default().explain_user_template);
  }

  #[test]
  fn unreadable_config_file_is_an_error() {
    let err = QuizConfig::load(PathBuf::from("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
  }
}
