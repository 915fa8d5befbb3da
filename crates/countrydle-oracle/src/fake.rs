//! A scripted [`LanguageModel`] for tests and offline runs.

use std::{
  collections::VecDeque,
  sync::{Mutex, PoisonError},
};

use countrydle_core::oracle::{InferenceError, LanguageModel};
use serde_json::Value;

/// Replays pre-defined completions in order and embeds text by hashing its
/// words into a fixed number of buckets, so texts sharing words are similar.
pub struct FakeModel {
  replies:   Mutex<VecDeque<Result<Value, InferenceError>>>,
  calls:     Mutex<Vec<(String, String)>>,
  dimension: usize,
}

impl FakeModel {
  pub const DIMENSION: usize = 32;

  pub fn new(replies: Vec<Result<Value, InferenceError>>) -> Self {
    Self {
      replies:   Mutex::new(replies.into()),
      calls:     Mutex::new(Vec::new()),
      dimension: Self::DIMENSION,
    }
  }

  /// A model that answers every completion successfully, in order.
  pub fn replying(replies: impl IntoIterator<Item = Value>) -> Self {
    Self::new(replies.into_iter().map(Ok).collect())
  }

  /// Queue another completion.
  pub fn push(&self, reply: Result<Value, InferenceError>) {
    self
      .replies
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push_back(reply);
  }

  /// Every `(system, user)` pair sent to `complete_json` so far.
  pub fn calls(&self) -> Vec<(String, String)> {
    self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn bucket(&self, word: &str) -> usize {
    // FNV-1a
    let hash = word.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
      (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    });
    (hash % self.dimension as u64) as usize
  }
}

impl LanguageModel for FakeModel {
  async fn complete_json<'a>(
    &'a self,
    system: &'a str,
    user: &'a str,
  ) -> Result<Value, InferenceError> {
    self
      .calls
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push((system.to_owned(), user.to_owned()));
    self
      .replies
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .pop_front()
      .unwrap_or_else(|| {
        Err(InferenceError::Unavailable("no scripted reply left".into()))
      })
  }

  async fn embed<'a>(&'a self, text: &'a str) -> Result<Vec<f32>, InferenceError> {
    let mut vector = vec![0.0; self.dimension];
    for word in text
      .split(|c: char| !c.is_alphanumeric())
      .filter(|w| !w.is_empty())
    {
      vector[self.bucket(&word.to_lowercase())] += 1.0;
    }
    Ok(vector)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[tokio::test]
  async fn replies_in_order_then_runs_dry() {
    let model = FakeModel::replying([json!({"n": 1}), json!({"n": 2})]);
    assert_eq!(model.complete_json("s", "a").await.unwrap()["n"], 1);
    assert_eq!(model.complete_json("s", "b").await.unwrap()["n"], 2);
    assert!(model.complete_json("s", "c").await.is_err());
    assert_eq!(model.calls().len(), 3);
    assert_eq!(model.calls()[1].1, "b");
  }

  #[tokio::test]
  async fn embeddings_are_deterministic() {
    let model = FakeModel::new(Vec::new());
    let a = model.embed("Tulips and windmills").await.unwrap();
    let b = model.embed("windmills AND tulips").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), FakeModel::DIMENSION);
  }
}
