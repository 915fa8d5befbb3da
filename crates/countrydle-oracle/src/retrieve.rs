//! The fact retriever.
//!
//! Embeds a question, searches the vector index restricted to one country and
//! loads the matching fragments from the store. The nearest `TOP_K` hits
//! are then ordered by fragment id so the same hits always produce the same
//! context text.

use countrydle_core::{
  country::Fragment,
  oracle::{LanguageModel, VectorIndex},
  store::GameStore,
};
use tracing::debug;

use crate::{Error, Result};

pub const TOP_K: usize = 5;

/// Separator placed between fragments in the oracle context.
pub const CONTEXT_SEPARATOR: &str = "\n[ ... ]\n";

pub async fn retrieve<M, V, S>(
  model: &M,
  index: &V,
  store: &S,
  question: &str,
  country_id: i64,
) -> Result<Vec<Fragment>>
where
  M: LanguageModel,
  V: VectorIndex,
  S: GameStore,
{
  let vector = model.embed(question).await?;
  let hits = index.search(&vector, country_id, TOP_K).await?;

  let mut ids: Vec<i64> = hits
    .iter()
    .filter(|hit| hit.country_id == country_id)
    .map(|hit| hit.fragment_id)
    .take(TOP_K)
    .collect();
  ids.sort_unstable();
  ids.dedup();

  let fragments: Vec<Fragment> = store
    .get_fragments(ids)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .into_iter()
    .filter(|f| f.country_id == country_id)
    .collect();

  debug!(country_id, hits = hits.len(), kept = fragments.len(), "facts retrieved");
  Ok(fragments)
}

/// Join fragment texts into the context block handed to the answer oracle.
pub fn context(fragments: &[Fragment]) -> String {
  fragments
    .iter()
    .map(|f| f.text.as_str())
    .collect::<Vec<_>>()
    .join(CONTEXT_SEPARATOR)
}
