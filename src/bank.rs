//! The question bank: an ordered list of questions read from a newline-delimited file.

use std::path::Path;

use tracing::{debug, instrument};

use crate::domain::Question;
use crate::error::StoreError;

/// Returned by `advance` when the cursor has walked past the last question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfBank;

#[derive(Clone, Debug, Default)]
pub struct QuestionBank {
  questions: Vec<Question>,
}

impl QuestionBank {
  /// Parse bank contents. Blank lines are skipped; any other bad line fails the whole load.
  pub fn parse(path: &Path, contents: &str) -> Result<Self, StoreError> {
    let mut questions = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
      if line.trim().is_empty() {
        continue;
      }
      let q = Question::parse_record(line).map_err(|source| StoreError::BadRecord {
        path: path.to_path_buf(),
        line: idx + 1,
        source,
      })?;
      questions.push(q);
    }
    Ok(Self { questions })
  }

  #[instrument(level = "debug", fields(path = %path.display()))]
  pub async fn load(path: &Path) -> Result<Self, StoreError> {
    let contents = tokio::fs::read_to_string(path)
      .await
      .map_err(|source| StoreError::Read { path: path.to_path_buf(), source })?;
    let bank = Self::parse(path, &contents)?;
    debug!(target: "quiz", size = bank.len(), "Question bank loaded");
    Ok(bank)
  }

  pub fn len(&self) -> usize {
    self.questions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.questions.is_empty()
  }

  /// Question at `cursor` and the cursor moved forward by exactly one.
  pub fn advance(&self, cursor: usize) -> Result<(Question, usize), EndOfBank> {
    self.questions
      .get(cursor)
      .cloned()
      .map(|q| (q, cursor + 1))
      .ok_or(EndOfBank)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Letter;
  use crate::error::RecordError;

  const BANK: &str = "B|2+2=?\n\nA|Capital of France? (A) Paris (B) Rome\r\nD|Last one\n";

  #[test]
  fn parse_skips_blank_lines() {
    let bank = QuestionBank::parse(Path::new("bank.txt"), BANK).unwrap();
    assert_eq!(bank.len(), 3);
    assert_eq!(bank.advance(1).unwrap().0.text, "Capital of France? (A) Paris (B) Rome");
  }

  #[test]
  fn parse_reports_line_number_of_bad_record() {
    let err = QuestionBank::parse(Path::new("bank.txt"), "A|ok\n\nX|bad\n").unwrap_err();
    match err {
      StoreError::BadRecord { line, source, .. } => {
        assert_eq!(line, 3);
        assert_eq!(source, RecordError::BadLetter("X".into()));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn advance_walks_in_bank_order() {
    let bank = QuestionBank::parse(Path::new("bank.txt"), BANK).unwrap();
    let (first, cursor) = bank.advance(0).unwrap();
    let (second, cursor) = bank.advance(cursor).unwrap();
    assert_eq!(first.correct_answer, Letter::B);
    assert_eq!(second.correct_answer, Letter::A);
    assert_eq!(cursor, 2);
  }

  #[test]
  fn advance_at_or_past_end_is_end_of_bank() {
    let bank = QuestionBank::parse(Path::new("bank.txt"), BANK).unwrap();
    assert_eq!(bank.advance(3), Err(EndOfBank));
    assert_eq!(bank.advance(10), Err(EndOfBank));
    assert_eq!(QuestionBank::default().advance(0), Err(EndOfBank));
  }
}
