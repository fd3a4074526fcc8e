//! Quiz Engine: turns one incoming chat text into exactly one reply text.
//!
//! Order of checks:
//!   1. trigger keyword  -> serve the next bank question (or report the bank exhausted)
//!   2. not A/B/C/D      -> instruct the valid inputs, whatever the session state
//!   3. no active question
//!   4. compare with the active question; wrong answers get a generated explanation
//!
//! Every branch, including storage and explainer failures, resolves to a reply.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::Replies;
use crate::domain::{Letter, Question};
use crate::openai::ExplanationGenerator;
use crate::store::{QuizStore, Served};
use crate::util::fill_template;

/// Trim and uppercase, the same way for user input and the configured keyword.
pub fn normalize_input(raw: &str) -> String {
  raw.trim().to_uppercase()
}

pub struct QuizEngine {
  store: Arc<QuizStore>,
  explainer: Arc<dyn ExplanationGenerator>,
  replies: Replies,
  trigger: String,
}

impl QuizEngine {
  pub fn new(
    store: Arc<QuizStore>,
    explainer: Arc<dyn ExplanationGenerator>,
    replies: Replies,
    trigger: String,
  ) -> Self {
    Self { store, explainer, replies, trigger }
  }

  pub fn store(&self) -> &QuizStore {
    &self.store
  }

  #[instrument(level = "info", skip(self, raw), fields(input_len = raw.len()))]
  pub async fn handle_incoming_text(&self, raw: &str) -> String {
    let input = normalize_input(raw);

    if input == self.trigger {
      return self.serve_next().await;
    }

    let Ok(chosen) = input.parse::<Letter>() else {
      debug!(target: "quiz", "Input is neither a letter nor the trigger keyword");
      return self.with_keyword(&self.replies.invalid_input);
    };

    let active = match self.store.active_question().await {
      Ok(Some(q)) => q,
      Ok(None) => {
        info!(target: "quiz", %chosen, "Answer received with no active question");
        return self.with_keyword(&self.replies.no_active_question);
      }
      Err(e) => {
        warn!(target: "quiz", error = %e, "Active question unreadable");
        return fill_template(&self.replies.storage_error, &[("error", &e.to_string())]);
      }
    };

    self.grade(&active, chosen).await
  }

  async fn serve_next(&self) -> String {
    match self.store.next_question().await {
      Ok(Served::Question { question, position, total }) => fill_template(
        &self.replies.question_served,
        &[
          ("question", &question.text),
          ("position", &position.to_string()),
          ("total", &total.to_string()),
        ],
      ),
      Ok(Served::Exhausted) => self.replies.bank_exhausted.clone(),
      Err(e) => {
        warn!(target: "quiz", error = %e, "Could not advance the bank");
        fill_template(&self.replies.storage_error, &[("error", &e.to_string())])
      }
    }
  }

  async fn grade(&self, active: &Question, chosen: Letter) -> String {
    let correct = active.correct_answer;
    if chosen == correct {
      info!(target: "quiz", %chosen, "Correct answer");
      return fill_template(&self.replies.correct, &[("correct", correct.as_str())]);
    }

    info!(target: "quiz", %chosen, %correct, "Incorrect answer; requesting explanation");
    match self.explainer.explain(&active.text, chosen, correct).await {
      Ok(explanation) => fill_template(
        &self.replies.incorrect,
        &[("correct", correct.as_str()), ("explanation", &explanation)],
      ),
      Err(e) => {
        warn!(target: "quiz", error = %e, "Explanation unavailable; replying with the answer only");
        fill_template(&self.replies.incorrect_no_explanation, &[("correct", correct.as_str())])
      }
    }
  }

  fn with_keyword(&self, tpl: &str) -> String {
    fill_template(tpl, &[("keyword", &self.trigger)])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ExplainError;
  use crate::openai::MockExplanationGenerator;
  use crate::store::StorePaths;
  use mockall::predicate::eq;
  use tempfile::TempDir;

  struct Fixture {
    _dir: TempDir,
    paths: StorePaths,
  }

  impl Fixture {
    fn new(bank: &str, active: Option<&str>) -> Self {
      let dir = TempDir::new().unwrap();
      let paths = StorePaths {
        bank: dir.path().join("question_bank.txt"),
        cursor: dir.path().join("bank_cursor.txt"),
        active: dir.path().join("latest_question.txt"),
      };
      std::fs::write(&paths.bank, bank).unwrap();
      if let Some(a) = active {
        std::fs::write(&paths.active, a).unwrap();
      }
      Self { _dir: dir, paths }
    }

    fn engine(&self, explainer: MockExplanationGenerator) -> QuizEngine {
      QuizEngine::new(
        Arc::new(QuizStore::new(self.paths.clone())),
        Arc::new(explainer),
        Replies::default(),
        "NEXT".into(),
      )
    }
  }

  fn never_called() -> MockExplanationGenerator {
    let mut m = MockExplanationGenerator::new();
    m.expect_explain().never();
    m
  }

  #[tokio::test]
  async fn invalid_input_is_rejected_regardless_of_active_question() {
    let invalid = Replies::default().invalid_input.replace("{keyword}", "NEXT");
    for active in [None, Some("B|2+2=?")] {
      let fx = Fixture::new("B|2+2=?\n", active);
      let engine = fx.engine(never_called());
      for input in ["", "E", "AB", "hello", "1", "next please", "A B"] {
        assert_eq!(engine.handle_incoming_text(input).await, invalid, "input {input:?}");
      }
    }
  }

  #[tokio::test]
  async fn answer_without_active_question_prompts_for_one() {
    let fx = Fixture::new("B|2+2=?\n", None);
    let reply = fx.engine(never_called()).handle_incoming_text("A").await;
    assert_eq!(reply, "⚠️ There is no question to answer yet. Send NEXT to get one!");
  }

  #[tokio::test]
  async fn correct_answer_is_praised_without_explainer() {
    let fx = Fixture::new("", Some("B|2+2=?"));
    let reply = fx.engine(never_called()).handle_incoming_text("  b \n").await;
    assert!(reply.contains('B'));
    assert!(reply.contains("Correct"));
  }

  #[tokio::test]
  async fn wrong_answer_embeds_generated_explanation() {
    let fx = Fixture::new("", Some("B|2+2=?"));
    let mut explainer = MockExplanationGenerator::new();
    explainer
      .expect_explain()
      .with(eq("2+2=?"), eq(Letter::C), eq(Letter::B))
      .times(1)
      .returning(|_, _, _| Ok("Two plus two is four, which is option B.".into()));

    let reply = fx.engine(explainer).handle_incoming_text("C").await;
    assert!(reply.contains("the correct answer is B"));
    assert!(reply.contains("Two plus two is four, which is option B."));
  }

  #[tokio::test]
  async fn explainer_failure_still_names_the_correct_answer() {
    let fx = Fixture::new("", Some("B|2+2=?"));
    let mut explainer = MockExplanationGenerator::new();
    explainer.expect_explain().times(1).returning(|_, _, _| Err(ExplainError::Empty));

    let reply = fx.engine(explainer).handle_incoming_text("c").await;
    assert!(reply.contains("the correct answer is B"));
    assert!(reply.contains("Explanation unavailable"));
    assert!(!reply.contains("Explanation:"));
  }

  #[tokio::test]
  async fn trigger_serves_questions_in_order_then_exhausts() {
    let fx = Fixture::new("B|2+2=?\nA|Capital of France?\n", None);
    let engine = fx.engine(never_called());

    assert_eq!(engine.handle_incoming_text("next").await, "📝 Question 1/2:\n2+2=?");
    assert_eq!(engine.handle_incoming_text(" NEXT ").await, "📝 Question 2/2:\nCapital of France?");
    assert_eq!(engine.handle_incoming_text("NEXT").await, Replies::default().bank_exhausted);

    // the last served question is still the one being answered
    let reply = engine.handle_incoming_text("A").await;
    assert!(reply.contains("Correct"));
  }

  #[tokio::test]
  async fn served_question_text_is_sent_verbatim() {
    let fx = Fixture::new("A|Fill the blank: {total} apples and {position} pears\n", None);
    let reply = fx.engine(never_called()).handle_incoming_text("NEXT").await;
    assert_eq!(reply, "📝 Question 1/1:\nFill the blank: {total} apples and {position} pears");
  }

  #[tokio::test]
  async fn unwritable_state_gives_degraded_reply() {
    let fx = Fixture::new("A|one\n", None);
    // a directory where the active-question file should be makes the write fail
    std::fs::create_dir(&fx.paths.active).unwrap();
    let reply = fx.engine(never_called()).handle_incoming_text("NEXT").await;
    assert!(reply.starts_with("❌ Could not load or save the question:"));
    assert!(!fx.paths.cursor.exists());
  }

  #[tokio::test]
  async fn corrupt_active_question_gives_degraded_reply() {
    let fx = Fixture::new("", Some("no delimiter here"));
    let reply = fx.engine(never_called()).handle_incoming_text("A").await;
    assert!(reply.starts_with("❌ Could not load or save the question:"));
  }

  #[tokio::test]
  async fn missing_bank_gives_degraded_reply_on_trigger() {
    let fx = Fixture::new("", None);
    std::fs::remove_file(&fx.paths.bank).unwrap();
    let reply = fx.engine(never_called()).handle_incoming_text("NEXT").await;
    assert!(reply.starts_with("❌ Could not load or save the question:"));
  }

  #[test]
  fn normalization_trims_and_uppercases() {
    assert_eq!(normalize_input("  d\t"), "D");
    assert_eq!(normalize_input("Next"), "NEXT");
  }
}
