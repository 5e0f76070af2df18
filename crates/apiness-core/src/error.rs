//! Error types for `apiness-core`.

use thiserror::Error;

use crate::filter::FORBIDDEN_SQL;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid identifier {name:?}: {reason}")]
  InvalidIdentifier { name: String, reason: String },

  #[error(
    "{param} contains a forbidden command: {value:?} (forbidden commands: {})",
    FORBIDDEN_SQL.join(", ")
  )]
  ForbiddenOperation { param: String, value: String },

  #[error("invalid operand {value:?}: {reason}")]
  InvalidOperand { value: String, reason: String },

  #[error("data format not supported: {0} (expected one of CSV, XLSX)")]
  UnsupportedFormat(String),

  /// Any failure reported by the storage engine.
  #[error("database {store} error, ensure the table exists: {source}")]
  Database {
    store:  String,
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("not found: {0}")]
  NotFound(String),

  #[error("corrupt route record: {0}")]
  CorruptRecord(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a storage-engine failure, naming the store it came from.
  pub fn database(
    store: impl Into<String>,
    source: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Database { store: store.into(), source: Box::new(source) }
  }

  /// `true` for errors caused by the caller's input, detected before any
  /// mutation or query took place.
  pub fn is_client_error(&self) -> bool {
    matches!(
      self,
      Self::InvalidIdentifier { .. }
        | Self::ForbiddenOperation { .. }
        | Self::InvalidOperand { .. }
        | Self::UnsupportedFormat(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
