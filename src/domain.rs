//! Domain models: answer letters, questions, and the `L|text` record they persist as.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::RecordError;

/// The four choices of a multiple-choice question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Letter {
  A,
  B,
  C,
  D,
}

impl Letter {
  pub fn as_str(self) -> &'static str {
    match self {
      Letter::A => "A",
      Letter::B => "B",
      Letter::C => "C",
      Letter::D => "D",
    }
  }
}

impl fmt::Display for Letter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Exact match only: callers normalize (trim + uppercase) before parsing.
impl FromStr for Letter {
  type Err = RecordError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "A" => Ok(Letter::A),
      "B" => Ok(Letter::B),
      "C" => Ok(Letter::C),
      "D" => Ok(Letter::D),
      other => Err(RecordError::BadLetter(other.to_string())),
    }
  }
}

/// A bank entry. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub correct_answer: Letter,
  pub text: String,
}

impl Question {
  /// Parse one `L|text` record. Splits on the first pipe; any further pipe is rejected
  /// because it could not be written back unambiguously.
  pub fn parse_record(line: &str) -> Result<Self, RecordError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (letter, text) = line.split_once('|').ok_or(RecordError::MissingDelimiter)?;
    let correct_answer = letter.trim().parse::<Letter>()?;
    if text.contains('|') {
      return Err(RecordError::PipeInText);
    }
    if text.trim().is_empty() {
      return Err(RecordError::EmptyText);
    }
    Ok(Self { correct_answer, text: text.to_string() })
  }

  pub fn to_record(&self) -> Result<String, RecordError> {
    if self.text.contains('|') {
      return Err(RecordError::PipeInText);
    }
    if self.text.contains(['\n', '\r']) {
      return Err(RecordError::Multiline);
    }
    Ok(format!("{}|{}", self.correct_answer, self.text))
  }
}
