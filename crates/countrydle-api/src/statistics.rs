//! Handlers for `/statistics` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/statistics/me` | Basic auth; lifetime totals for the caller |
//! | `GET`  | `/statistics/rounds` | Past rounds and per-country pick counts |

use std::sync::Arc;

use axum::{Json, extract::State};
use countrydle_core::{
  oracle::{LanguageModel, VectorIndex},
  standing::UserStatistics,
  store::GameStore,
};

use crate::{
  auth::Player,
  error::ApiError,
  game::{Game, RoundStatistics},
};

/// `GET /statistics/me`
pub async fn me<S, M, V>(
  State(game): State<Arc<Game<S, M, V>>>,
  Player(user): Player,
) -> Result<Json<UserStatistics>, ApiError>
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  Ok(Json(game.statistics(&user).await?))
}

/// `GET /statistics/rounds`
pub async fn rounds<S, M, V>(
  State(game): State<Arc<Game<S, M, V>>>,
) -> Result<Json<RoundStatistics>, ApiError>
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  Ok(Json(game.round_statistics().await?))
}
