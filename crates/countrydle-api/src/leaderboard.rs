//! `GET /leaderboard`: public, no auth.

use std::sync::Arc;

use axum::{Json, extract::State};
use countrydle_core::{
  oracle::{LanguageModel, VectorIndex},
  standing::LeaderboardEntry,
  store::GameStore,
};

use crate::{error::ApiError, game::Game};

pub async fn handler<S, M, V>(
  State(game): State<Arc<Game<S, M, V>>>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError>
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  Ok(Json(game.leaderboard().await?))
}
