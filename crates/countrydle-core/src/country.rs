//! The country catalog: immutable reference data seeded once.
//!
//! A country owns its descriptive source text; the text is split into
//! [`Fragment`]s, each carrying an embedding vector, which the fact retriever
//! searches at question time.

use serde::{Deserialize, Serialize};

/// A country that can be picked as the country of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
  pub country_id:    i64,
  /// Short display name, e.g. "Netherlands".
  pub name:          String,
  /// Official name, e.g. "Kingdom of the Netherlands".
  pub official_name: String,
  #[serde(skip_serializing)]
  pub source_text:   String,
}

/// Input to [`crate::store::GameStore::add_country`].
#[derive(Debug, Clone)]
pub struct NewCountry {
  pub name:          String,
  pub official_name: String,
  pub source_text:   String,
}

/// A retrievable chunk of a country's source text with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
  pub fragment_id: i64,
  pub country_id:  i64,
  pub text:        String,
  #[serde(skip)]
  pub embedding:   Vec<f32>,
}

/// Input to [`crate::store::GameStore::add_fragments`].
#[derive(Debug, Clone)]
pub struct NewFragment {
  pub text:      String,
  pub embedding: Vec<f32>,
}
