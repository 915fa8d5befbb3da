//! Seams to the external inference endpoint and vector similarity index.
//!
//! Both are process-wide clients constructed once at startup and shared by
//! reference. Implementations live in `countrydle-oracle`.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Inference ───────────────────────────────────────────────────────────────

/// A failed call to the inference endpoint.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
  #[error("inference request timed out after {0} seconds")]
  Timeout(u64),

  #[error("inference endpoint unavailable: {0}")]
  Unavailable(String),

  #[error("inference endpoint returned HTTP {code}: {message}")]
  Status { code: u16, message: String },

  /// The endpoint answered, but not with the structured output requested.
  #[error("malformed inference output: {0}")]
  Malformed(String),
}

impl InferenceError {
  /// Timeouts, transport failures, rate limiting and 5xx responses may
  /// succeed on a later attempt; everything else will not.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Timeout(_) | Self::Unavailable(_) => true,
      Self::Status { code, .. } => *code == 429 || *code >= 500,
      Self::Malformed(_) => false,
    }
  }
}

/// A synchronous request/response language model returning JSON.
pub trait LanguageModel: Send + Sync {
  /// Run a completion with a system prompt and user content, returning the
  /// parsed JSON object the model produced.
  fn complete_json<'a>(
    &'a self,
    system: &'a str,
    user: &'a str,
  ) -> impl Future<Output = Result<serde_json::Value, InferenceError>> + Send + 'a;

  /// Embed `text` into a vector for similarity search.
  fn embed<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<f32>, InferenceError>> + Send + 'a;
}

// ─── Vector index ────────────────────────────────────────────────────────────

/// A failed call to the vector index.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
  #[error("vector index unavailable: {0}")]
  Unavailable(String),

  #[error("vector index returned HTTP {code}: {message}")]
  Status { code: u16, message: String },

  #[error("unexpected vector index response: {0}")]
  Malformed(String),

  #[error("vector has {got} dimensions, collection expects {expected}")]
  Dimension { expected: usize, got: usize },

  /// The backend cannot perform this operation at all.
  #[error("vector index does not support {0}")]
  Unsupported(String),
}

impl IndexError {
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Unavailable(_) => true,
      Self::Status { code, .. } => *code >= 500,
      Self::Malformed(_) | Self::Dimension { .. } | Self::Unsupported(_) => false,
    }
  }
}

/// One vector stored in the index, keyed by fragment id and tagged with the
/// owning country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPoint {
  pub fragment_id: i64,
  pub country_id:  i64,
  pub vector:      Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
  pub fragment_id: i64,
  pub country_id:  i64,
  pub score:       f32,
}

/// A similarity-search collection of fragment vectors.
pub trait VectorIndex: Send + Sync {
  fn collection_exists(
    &self,
  ) -> impl Future<Output = Result<bool, IndexError>> + Send + '_;

  /// Create the collection for vectors of `dimension` (cosine distance).
  fn create_collection(
    &self,
    dimension: usize,
  ) -> impl Future<Output = Result<(), IndexError>> + Send + '_;

  /// Restore the collection from a snapshot instead of re-embedding.
  fn recover_snapshot<'a>(
    &'a self,
    location: &'a str,
  ) -> impl Future<Output = Result<(), IndexError>> + Send + 'a;

  /// Insert or replace points by fragment id.
  fn upsert(
    &self,
    points: Vec<IndexPoint>,
  ) -> impl Future<Output = Result<(), IndexError>> + Send + '_;

  /// Which of `ids` are already present.
  fn existing<'a>(
    &'a self,
    ids: &'a [i64],
  ) -> impl Future<Output = Result<Vec<i64>, IndexError>> + Send + 'a;

  /// Top-`limit` nearest neighbours of `vector` among points tagged with
  /// `country_id`, best first.
  fn search<'a>(
    &'a self,
    vector: &'a [f32],
    country_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ScoredPoint>, IndexError>> + Send + 'a;
}
