//! [`QdrantIndex`]: a [`VectorIndex`] over the Qdrant REST API.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | exists    | `GET  /collections/{c}/exists` |
//! | create    | `PUT  /collections/{c}` |
//! | recover   | `PUT  /collections/{c}/snapshots/recover` |
//! | upsert    | `PUT  /collections/{c}/points?wait=true` |
//! | existing  | `POST /collections/{c}/points` |
//! | search    | `POST /collections/{c}/points/search` |
//!
//! Points are keyed by fragment id and carry `{"country_id": ..}` as payload.

use std::time::Duration;

use countrydle_core::oracle::{IndexError, IndexPoint, ScoredPoint, VectorIndex};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

pub struct QdrantIndex {
  http:       reqwest::Client,
  base_url:   String,
  collection: String,
}

/// Every Qdrant response wraps its payload in `result`.
#[derive(Deserialize)]
struct Envelope<T> {
  result: T,
}

#[derive(Deserialize)]
struct Exists {
  exists: bool,
}

#[derive(Deserialize)]
struct Record {
  id: Value,
}

#[derive(Deserialize)]
struct Hit {
  id:      Value,
  score:   f32,
  #[serde(default)]
  payload: Option<Value>,
}

fn point_id(id: &Value) -> Result<i64, IndexError> {
  id.as_i64()
    .ok_or_else(|| IndexError::Malformed(format!("point id {id} is not an integer")))
}

impl QdrantIndex {
  pub fn new(
    base_url: impl Into<String>,
    collection: impl Into<String>,
    timeout_secs: u64,
  ) -> Result<Self, IndexError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .build()
      .map_err(|e| IndexError::Unavailable(format!("building HTTP client: {e}")))?;
    Ok(Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_owned(),
      collection: collection.into(),
    })
  }

  fn url(&self, suffix: &str) -> String {
    format!("{}/collections/{}{suffix}", self.base_url, self.collection)
  }

  async fn send<T: DeserializeOwned>(
    &self,
    request: reqwest::RequestBuilder,
  ) -> Result<T, IndexError> {
    let response = request
      .send()
      .await
      .map_err(|e| IndexError::Unavailable(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
      let message = response.text().await.unwrap_or_default();
      return Err(IndexError::Status { code: status.as_u16(), message });
    }
    let envelope: Envelope<T> = response
      .json()
      .await
      .map_err(|e| IndexError::Malformed(e.to_string()))?;
    Ok(envelope.result)
  }
}

fn upsert_body(points: &[IndexPoint]) -> Value {
  let points: Vec<Value> = points
    .iter()
    .map(|p| {
      json!({
        "id": p.fragment_id,
        "vector": p.vector,
        "payload": {"country_id": p.country_id},
      })
    })
    .collect();
  json!({ "points": points })
}

fn search_body(vector: &[f32], country_id: i64, limit: usize) -> Value {
  json!({
    "vector": vector,
    "limit": limit,
    "with_payload": true,
    "filter": {
      "must": [{"key": "country_id", "match": {"value": country_id}}]
    },
  })
}

fn scored(hit: Hit) -> Result<ScoredPoint, IndexError> {
  let country_id = hit
    .payload
    .as_ref()
    .and_then(|p| p.get("country_id"))
    .and_then(Value::as_i64)
    .ok_or_else(|| IndexError::Malformed(format!("hit {} has no country_id", hit.id)))?;
  Ok(ScoredPoint {
    fragment_id: point_id(&hit.id)?,
    country_id,
    score: hit.score,
  })
}

impl VectorIndex for QdrantIndex {
  async fn collection_exists(&self) -> Result<bool, IndexError> {
    let exists: Exists = self.send(self.http.get(self.url("/exists"))).await?;
    Ok(exists.exists)
  }

  async fn create_collection(&self, dimension: usize) -> Result<(), IndexError> {
    let body = json!({"vectors": {"size": dimension, "distance": "Cosine"}});
    let _: Value = self.send(self.http.put(self.url("")).json(&body)).await?;
    Ok(())
  }

  async fn recover_snapshot<'a>(&'a self, location: &'a str) -> Result<(), IndexError> {
    let body = json!({ "location": location });
    let request = self.http.put(self.url("/snapshots/recover")).json(&body);
    let _: Value = self.send(request).await?;
    Ok(())
  }

  async fn upsert(&self, points: Vec<IndexPoint>) -> Result<(), IndexError> {
    if points.is_empty() {
      return Ok(());
    }
    let request = self
      .http
      .put(self.url("/points?wait=true"))
      .json(&upsert_body(&points));
    let _: Value = self.send(request).await?;
    Ok(())
  }

  async fn existing<'a>(&'a self, ids: &'a [i64]) -> Result<Vec<i64>, IndexError> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let body = json!({"ids": ids, "with_payload": false, "with_vector": false});
    let records: Vec<Record> =
      self.send(self.http.post(self.url("/points")).json(&body)).await?;
    records.iter().map(|r| point_id(&r.id)).collect()
  }

  async fn search<'a>(
    &'a self,
    vector: &'a [f32],
    country_id: i64,
    limit: usize,
  ) -> Result<Vec<ScoredPoint>, IndexError> {
    let request = self
      .http
      .post(self.url("/points/search"))
      .json(&search_body(vector, country_id, limit));
    let hits: Vec<Hit> = self.send(request).await?;
    hits.into_iter().map(scored).collect()
  }
}
