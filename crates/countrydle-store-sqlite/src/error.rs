//! Error type for `countrydle-store-sqlite`.

use countrydle_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] countrydle_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// Raised by statements run inside a `call` closure.
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value that does not decode into its domain type.
  #[error("corrupt row: {0}")]
  Corrupt(String),

  /// An insert violated a constraint and no existing row explains it.
  #[error("constraint violation: {0}")]
  Constraint(String),

  #[error("username already taken: {0}")]
  UsernameTaken(String),
}

impl StoreError for Error {
  fn as_rule(&self) -> Option<&countrydle_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
