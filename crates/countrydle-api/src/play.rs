//! Handlers for `/game` endpoints. All require Basic auth.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/game/state` | Creates today's session on first access |
//! | `POST` | `/game/question` | Body: `{"question":"..."}`; 429 when out of questions |
//! | `POST` | `/game/guess` | Body: `{"guess":"..."}`; 409 once the game is over |
//! | `GET`  | `/game/end` | 409 until the game is over |
//! | `GET`  | `/game/history` | Finished sessions, newest first |

use std::sync::Arc;

use axum::{Json, extract::State};
use countrydle_core::{
  oracle::{LanguageModel, VectorIndex},
  standing::SessionSummary,
  store::GameStore,
};
use serde::Deserialize;

use crate::{
  auth::Player,
  error::ApiError,
  game::{EndState, Game, GuessReply, QuestionReply, RoundState},
};

/// `GET /game/state`
pub async fn state<S, M, V>(
  State(game): State<Arc<Game<S, M, V>>>,
  Player(user): Player,
) -> Result<Json<RoundState>, ApiError>
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  Ok(Json(game.round_state(&user).await?))
}

#[derive(Debug, Deserialize)]
pub struct QuestionBody {
  pub question: String,
}

/// `POST /game/question`
pub async fn question<S, M, V>(
  State(game): State<Arc<Game<S, M, V>>>,
  Player(user): Player,
  Json(body): Json<QuestionBody>,
) -> Result<Json<QuestionReply>, ApiError>
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  Ok(Json(game.submit_question(&user, &body.question).await?))
}

#[derive(Debug, Deserialize)]
pub struct GuessBody {
  pub guess: String,
}

/// `POST /game/guess`
pub async fn guess<S, M, V>(
  State(game): State<Arc<Game<S, M, V>>>,
  Player(user): Player,
  Json(body): Json<GuessBody>,
) -> Result<Json<GuessReply>, ApiError>
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  Ok(Json(game.submit_guess(&user, &body.guess).await?))
}

/// `GET /game/end`
pub async fn end<S, M, V>(
  State(game): State<Arc<Game<S, M, V>>>,
  Player(user): Player,
) -> Result<Json<EndState>, ApiError>
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  Ok(Json(game.end_state(&user).await?))
}

/// `GET /game/history`
pub async fn history<S, M, V>(
  State(game): State<Arc<Game<S, M, V>>>,
  Player(user): Player,
) -> Result<Json<Vec<SessionSummary>>, ApiError>
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  Ok(Json(game.history(&user).await?))
}
