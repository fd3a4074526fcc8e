//! Error types for configuration, persisted state and the two outbound collaborators.
//!
//! None of these reach the chat user verbatim except `StoreError`, whose message is embedded in
//! the degraded "could not read the question" reply.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("missing required environment variable {0}")]
  Missing(&'static str),
  #[error("invalid value for {key}: {reason}")]
  Invalid { key: &'static str, reason: String },
  #[error("failed to read config file {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },
  #[error("failed to parse config file {path}: {source}")]
  Parse { path: PathBuf, source: toml::de::Error },
}

/// A single `L|text` record that does not parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
  #[error("record has no '|' delimiter")]
  MissingDelimiter,
  #[error("'{0}' is not one of A, B, C, D")]
  BadLetter(String),
  #[error("question text is empty")]
  EmptyText,
  #[error("question text contains the '|' delimiter")]
  PipeInText,
  #[error("question text spans more than one line")]
  Multiline,
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("cannot read {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },
  #[error("cannot write {path}: {source}")]
  Write { path: PathBuf, source: std::io::Error },
  #[error("{path} line {line}: {source}")]
  BadRecord { path: PathBuf, line: usize, source: RecordError },
  #[error("{path} does not hold a cursor: {content:?}")]
  BadCursor { path: PathBuf, content: String },
  #[error("refusing to persist question: {0}")]
  Unpersistable(RecordError),
}

#[derive(Debug, Error)]
pub enum ExplainError {
  #[error("explanation request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("explanation API returned HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("explanation API returned no content")]
  Empty,
}

#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("reply request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("reply API returned HTTP {status}: {message}")]
  Status { status: u16, message: String },
}
