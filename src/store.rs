//! Persisted quiz state: the bank cursor and the active question.
//!
//! Three flat files back the quiz:
//!   - bank   : newline-delimited `L|text` records (read-only here)
//!   - cursor : decimal index of the next unserved question
//!   - active : one `L|text` record, the question most recently served
//!
//! The files are the source of truth and may be edited by operators between requests.
//! Every access goes through one async mutex, so "advance" is a single atomic
//! read-modify-write even if the server handles requests concurrently.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::bank::{EndOfBank, QuestionBank};
use crate::domain::Question;
use crate::error::StoreError;

#[derive(Clone, Debug)]
pub struct StorePaths {
  pub bank: PathBuf,
  pub cursor: PathBuf,
  pub active: PathBuf,
}

/// Outcome of asking for the next question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Served {
  Question { question: Question, position: usize, total: usize },
  Exhausted,
}

/// Read-only view used by the status endpoint.
#[derive(Clone, Debug)]
pub struct Snapshot {
  pub cursor: usize,
  pub bank_size: usize,
  pub active: Option<Question>,
}

pub struct QuizStore {
  paths: Mutex<StorePaths>,
}

impl QuizStore {
  pub fn new(paths: StorePaths) -> Self {
    Self { paths: Mutex::new(paths) }
  }

  /// Serve the question under the cursor.
  ///
  /// The active question is written before the cursor: a crash in between re-serves the
  /// same question on the next request instead of skipping it.
  #[instrument(level = "info", skip(self))]
  pub async fn next_question(&self) -> Result<Served, StoreError> {
    let paths = self.paths.lock().await;
    let bank = QuestionBank::load(&paths.bank).await?;
    if bank.is_empty() {
      warn!(target: "quiz", path = %paths.bank.display(), "Question bank is empty");
    }
    let cursor = read_cursor(&paths.cursor).await?;

    let (question, next) = match bank.advance(cursor) {
      Ok(served) => served,
      Err(EndOfBank) => {
        info!(target: "quiz", cursor, bank_size = bank.len(), "Bank exhausted");
        return Ok(Served::Exhausted);
      }
    };

    write_active(&paths.active, &question).await?;
    write_cursor(&paths.cursor, next).await?;
    info!(target: "quiz", position = next, bank_size = bank.len(), "Question served");
    Ok(Served::Question { question, position: next, total: bank.len() })
  }

  /// The question the next answer is checked against, if one was ever served.
  #[instrument(level = "debug", skip(self))]
  pub async fn active_question(&self) -> Result<Option<Question>, StoreError> {
    let paths = self.paths.lock().await;
    read_active(&paths.active).await
  }

  pub async fn snapshot(&self) -> Result<Snapshot, StoreError> {
    let paths = self.paths.lock().await;
    let bank_size = QuestionBank::load(&paths.bank).await?.len();
    let cursor = read_cursor(&paths.cursor).await?;
    let active = read_active(&paths.active).await?;
    Ok(Snapshot { cursor, bank_size, active })
  }
}

/// `None` when the file does not exist; any other IO failure is an error.
async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
  match tokio::fs::read_to_string(path).await {
    Ok(s) => Ok(Some(s)),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
    Err(source) => Err(StoreError::Read { path: path.to_path_buf(), source }),
  }
}

async fn write_file(path: &Path, contents: String) -> Result<(), StoreError> {
  tokio::fs::write(path, contents)
    .await
    .map_err(|source| StoreError::Write { path: path.to_path_buf(), source })
}

/// A missing cursor file is a fresh quiz.
async fn read_cursor(path: &Path) -> Result<usize, StoreError> {
  let Some(content) = read_optional(path).await? else {
    return Ok(0);
  };
  content.trim().parse::<usize>().map_err(|_| {
    warn!(target: "quiz", path = %path.display(), "Cursor file is corrupt");
    StoreError::BadCursor { path: path.to_path_buf(), content }
  })
}

async fn write_cursor(path: &Path, cursor: usize) -> Result<(), StoreError> {
  write_file(path, cursor.to_string()).await
}

async fn read_active(path: &Path) -> Result<Option<Question>, StoreError> {
  let Some(content) = read_optional(path).await? else {
    return Ok(None);
  };
  Question::parse_record(&content)
    .map(Some)
    .map_err(|source| StoreError::BadRecord { path: path.to_path_buf(), line: 1, source })
}

async fn write_active(path: &Path, question: &Question) -> Result<(), StoreError> {
  let record = question.to_record().map_err(StoreError::Unpersistable)?;
  write_file(path, record).await
}
