//! An in-process [`VectorIndex`] with exact cosine search.
//!
//! Suited to small catalogs and tests. Contents are lost on restart, so the
//! server repopulates it from stored fragments at startup.

use std::collections::BTreeMap;

use countrydle_core::oracle::{IndexError, IndexPoint, ScoredPoint, VectorIndex};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryIndex {
  dimension: RwLock<Option<usize>>,
  points:    RwLock<BTreeMap<i64, IndexPoint>>,
}

impl MemoryIndex {
  pub fn new() -> Self { Self::default() }

  async fn require_dimension(&self) -> Result<usize, IndexError> {
    self.dimension.read().await.ok_or_else(|| IndexError::Status {
      code:    404,
      message: "collection does not exist".into(),
    })
  }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
  let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
  let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
  let denom = norm(a) * norm(b);
  if denom == 0.0 { 0.0 } else { dot / denom }
}

impl VectorIndex for MemoryIndex {
  async fn collection_exists(&self) -> Result<bool, IndexError> {
    Ok(self.dimension.read().await.is_some())
  }

  async fn create_collection(&self, dimension: usize) -> Result<(), IndexError> {
    *self.dimension.write().await = Some(dimension);
    self.points.write().await.clear();
    Ok(())
  }

  async fn recover_snapshot<'a>(&'a self, location: &'a str) -> Result<(), IndexError> {
    Err(IndexError::Unsupported(format!("snapshot recovery ({location})")))
  }

  async fn upsert(&self, points: Vec<IndexPoint>) -> Result<(), IndexError> {
    let dimension = self.require_dimension().await?;
    if let Some(bad) = points.iter().find(|p| p.vector.len() != dimension) {
      return Err(IndexError::Dimension { expected: dimension, got: bad.vector.len() });
    }
    let mut stored = self.points.write().await;
    for point in points {
      stored.insert(point.fragment_id, point);
    }
    Ok(())
  }

  async fn existing<'a>(&'a self, ids: &'a [i64]) -> Result<Vec<i64>, IndexError> {
    self.require_dimension().await?;
    let stored = self.points.read().await;
    Ok(ids.iter().copied().filter(|id| stored.contains_key(id)).collect())
  }

  async fn search<'a>(
    &'a self,
    vector: &'a [f32],
    country_id: i64,
    limit: usize,
  ) -> Result<Vec<ScoredPoint>, IndexError> {
    let dimension = self.require_dimension().await?;
    if vector.len() != dimension {
      return Err(IndexError::Dimension { expected: dimension, got: vector.len() });
    }

    let stored = self.points.read().await;
    let mut hits: Vec<ScoredPoint> = stored
      .values()
      .filter(|p| p.country_id == country_id)
      .map(|p| ScoredPoint {
        fragment_id: p.fragment_id,
        country_id:  p.country_id,
        score:       cosine(vector, &p.vector),
      })
      .collect();
    hits.sort_by(|a, b| {
      b.score
        .total_cmp(&a.score)
        .then_with(|| a.fragment_id.cmp(&b.fragment_id))
    });
    hits.truncate(limit);
    Ok(hits)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn point(fragment_id: i64, country_id: i64, vector: [f32; 2]) -> IndexPoint {
    IndexPoint { fragment_id, country_id, vector: vector.to_vec() }
  }

  #[tokio::test]
  async fn search_ranks_by_cosine_within_country() {
    let index = MemoryIndex::new();
    assert!(!index.collection_exists().await.unwrap());
    index.create_collection(2).await.unwrap();
    index
      .upsert(vec![
        point(1, 10, [1.0, 0.0]),
        point(2, 10, [0.6, 0.8]),
        point(3, 20, [1.0, 0.0]),
        point(4, 10, [0.0, 1.0]),
      ])
      .await
      .unwrap();

    let hits = index.search(&[1.0, 0.1], 10, 2).await.unwrap();
    let ids: Vec<_> = hits.iter().map(|h| h.fragment_id).collect();
    assert_eq!(ids, [1, 2]);
    assert!(hits.iter().all(|h| h.country_id == 10));
  }

  #[tokio::test]
  async fn existing_and_dimension_checks() {
    let index = MemoryIndex::new();
    assert!(index.upsert(vec![point(1, 1, [1.0, 0.0])]).await.is_err());

    index.create_collection(2).await.unwrap();
    index.upsert(vec![point(1, 1, [1.0, 0.0])]).await.unwrap();
    assert_eq!(index.existing(&[1, 2]).await.unwrap(), [1]);

    let err = index.search(&[1.0], 1, 5).await.unwrap_err();
    assert!(matches!(err, IndexError::Dimension { expected: 2, got: 1 }));
  }

  #[tokio::test]
  async fn snapshots_are_unsupported_and_not_retried() {
    let index = MemoryIndex::new();
    let err = index.recover_snapshot("file:///snapshots/countries.snapshot").await.unwrap_err();
    assert!(matches!(err, IndexError::Unsupported(_)));
    assert!(!err.is_retryable());
    assert!(!index.collection_exists().await.unwrap());
  }

  #[test]
  fn zero_vectors_score_zero() {
    assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    assert!((cosine(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
  }
}
