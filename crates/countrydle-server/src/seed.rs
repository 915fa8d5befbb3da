//! Catalog seeding: countries, their fact fragments and embeddings.
//!
//! A catalog is a JSON array of `{"name", "official_name", "text_file"}`
//! objects; `text_file` is resolved relative to the catalog's directory.

use std::{
  collections::HashSet,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use countrydle_core::{
  country::{NewCountry, NewFragment},
  oracle::LanguageModel,
  split::Splitter,
  store::GameStore,
};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct CatalogEntry {
  name:          String,
  official_name: String,
  text_file:     PathBuf,
}

/// What one seeding run wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
  pub added:     usize,
  /// Entries whose name was already in the catalog.
  pub skipped:   usize,
  pub fragments: usize,
}

/// Read the catalog at `path` together with every country's source text.
pub fn load_catalog(path: &Path) -> anyhow::Result<Vec<NewCountry>> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read catalog {}", path.display()))?;
  let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)
    .with_context(|| format!("failed to parse catalog {}", path.display()))?;
  let base = path.parent().unwrap_or(Path::new("."));

  entries
    .into_iter()
    .map(|entry| {
      let file = base.join(&entry.text_file);
      let source_text = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {} for {}", file.display(), entry.name))?;
      Ok(NewCountry {
        name: entry.name,
        official_name: entry.official_name,
        source_text,
      })
    })
    .collect()
}

/// Insert every country of `countries` whose name is not stored yet,
/// together with its embedded fragments.
///
/// Each country is committed with its fragments in one transaction, so a run
/// that fails part way leaves whole countries behind and a later run adds the
/// rest.
pub async fn seed<S, M>(
  store: &S,
  model: &M,
  countries: Vec<NewCountry>,
) -> anyhow::Result<SeedReport>
where
  S: GameStore,
  M: LanguageModel,
{
  let mut known: HashSet<String> = store
    .list_countries()
    .await?
    .into_iter()
    .map(|c| c.name)
    .collect();

  let splitter = Splitter::default();
  let mut report = SeedReport::default();
  for input in countries {
    if known.contains(&input.name) {
      debug!(country = %input.name, "already seeded");
      report.skipped += 1;
      continue;
    }

    let mut fragments = Vec::new();
    for text in splitter.split(&input.source_text) {
      let embedding = model
        .embed(&text)
        .await
        .with_context(|| format!("embedding a fragment of {}", input.name))?;
      fragments.push(NewFragment { text, embedding });
    }

    let (country, stored) = store.add_country_with_fragments(input, fragments).await?;
    info!(country = %country.name, fragments = stored.len(), "country seeded");
    report.added += 1;
    report.fragments += stored.len();
    known.insert(country.name);
  }
  Ok(report)
}
