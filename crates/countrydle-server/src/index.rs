//! Vector index selection and startup population.

use std::path::Path;

use anyhow::Context as _;
use countrydle_core::{
  oracle::{IndexError, IndexPoint, ScoredPoint, VectorIndex},
  store::GameStore,
};
use countrydle_oracle::{MemoryIndex, QdrantIndex};
use tracing::{debug, info, warn};

use crate::config::{IndexConfig, IndexKind};

/// The index backend chosen by configuration.
pub enum AnyIndex {
  Qdrant(QdrantIndex),
  Memory(MemoryIndex),
}

impl AnyIndex {
  pub fn from_config(config: &IndexConfig) -> Result<Self, IndexError> {
    Ok(match config.kind {
      IndexKind::Qdrant => Self::Qdrant(QdrantIndex::new(
        &config.url,
        &config.collection,
        config.timeout_secs,
      )?),
      IndexKind::Memory => Self::Memory(MemoryIndex::new()),
    })
  }
}

impl VectorIndex for AnyIndex {
  async fn collection_exists(&self) -> Result<bool, IndexError> {
    match self {
      Self::Qdrant(index) => index.collection_exists().await,
      Self::Memory(index) => index.collection_exists().await,
    }
  }

  async fn create_collection(&self, dimension: usize) -> Result<(), IndexError> {
    match self {
      Self::Qdrant(index) => index.create_collection(dimension).await,
      Self::Memory(index) => index.create_collection(dimension).await,
    }
  }

  async fn recover_snapshot<'a>(&'a self, location: &'a str) -> Result<(), IndexError> {
    match self {
      Self::Qdrant(index) => index.recover_snapshot(location).await,
      Self::Memory(index) => index.recover_snapshot(location).await,
    }
  }

  async fn upsert(&self, points: Vec<IndexPoint>) -> Result<(), IndexError> {
    match self {
      Self::Qdrant(index) => index.upsert(points).await,
      Self::Memory(index) => index.upsert(points).await,
    }
  }

  async fn existing<'a>(&'a self, ids: &'a [i64]) -> Result<Vec<i64>, IndexError> {
    match self {
      Self::Qdrant(index) => index.existing(ids).await,
      Self::Memory(index) => index.existing(ids).await,
    }
  }

  async fn search<'a>(
    &'a self,
    vector: &'a [f32],
    country_id: i64,
    limit: usize,
  ) -> Result<Vec<ScoredPoint>, IndexError> {
    match self {
      Self::Qdrant(index) => index.search(vector, country_id, limit).await,
      Self::Memory(index) => index.search(vector, country_id, limit).await,
    }
  }
}

// ─── Initialisation ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexInit {
  /// The collection was already there; nothing was touched.
  Existing,
  Recovered,
  Built { upserted: usize },
}

fn snapshot_location(path: &Path) -> String { format!("file://{}", path.display()) }

/// Make sure the collection exists: keep it, restore it from the configured
/// snapshot, or create it and upload every stored fragment.
pub async fn init_index<S, V>(
  index: &V,
  store: &S,
  config: &IndexConfig,
) -> anyhow::Result<IndexInit>
where
  S: GameStore,
  V: VectorIndex,
{
  if index.collection_exists().await.context("checking collection")? {
    info!(collection = %config.collection, "vector collection present");
    return Ok(IndexInit::Existing);
  }

  if let Some(path) = &config.snapshot_path
    && path.exists()
  {
    let location = snapshot_location(path);
    info!(%location, "recovering vector collection from snapshot");
    match index.recover_snapshot(&location).await {
      Ok(()) => return Ok(IndexInit::Recovered),
      Err(IndexError::Unsupported(what)) => {
        warn!(%what, "backend cannot restore snapshots, building the collection instead");
      }
      Err(e) => {
        return Err(anyhow::Error::new(e).context(format!("recovering snapshot {location}")));
      }
    }
  }

  index
    .create_collection(config.embedding_size)
    .await
    .context("creating collection")?;
  let upserted = populate(index, store).await?;
  info!(upserted, "vector collection built from stored fragments");
  Ok(IndexInit::Built { upserted })
}

/// Upload stored fragments, skipping countries whose fragments are all in
/// the index already. Returns the number of points written.
pub async fn populate<S, V>(index: &V, store: &S) -> anyhow::Result<usize>
where
  S: GameStore,
  V: VectorIndex,
{
  let mut upserted = 0;
  for country in store.list_countries().await? {
    let fragments = store.fragments_for_country(country.country_id).await?;
    let ids: Vec<i64> = fragments.iter().map(|f| f.fragment_id).collect();
    let present = index.existing(&ids).await?;
    if present.len() == ids.len() {
      debug!(country = %country.name, "fragments already indexed");
      continue;
    }

    let points: Vec<IndexPoint> = fragments
      .into_iter()
      .map(|f| IndexPoint {
        fragment_id: f.fragment_id,
        country_id:  f.country_id,
        vector:      f.embedding,
      })
      .collect();
    upserted += points.len();
    index
      .upsert(points)
      .await
      .with_context(|| format!("indexing fragments of {}", country.name))?;
  }
  Ok(upserted)
}
