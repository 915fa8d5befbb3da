//! Error type for `countrydle-oracle`.

use countrydle_core::oracle::{IndexError, InferenceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Inference(#[from] InferenceError),

  #[error(transparent)]
  Index(#[from] IndexError),

  /// The model answered with JSON that does not fit the expected shape.
  #[error(transparent)]
  Rule(#[from] countrydle_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Inference(e) => e.is_retryable(),
      Self::Index(e) => e.is_retryable(),
      Self::Rule(_) | Self::Store(_) => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shorthand for the hard failure raised on unusable model output.
pub(crate) fn malformed(detail: impl Into<String>) -> Error {
  Error::Rule(countrydle_core::Error::MalformedOracleOutput(detail.into()))
}
