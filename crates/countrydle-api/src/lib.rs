//! JSON REST API for Countrydle.
//!
//! Exposes an axum [`Router`] backed by a [`Game`], which ties together any
//! [`GameStore`], [`LanguageModel`] and [`VectorIndex`]. Players authenticate
//! with HTTP Basic credentials checked against the stored argon2 hashes.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let game = Arc::new(Game::new(store, model, index));
//! axum::serve(listener, countrydle_api::api_router(game)).await?;
//! ```

pub mod auth;
pub mod error;
pub mod game;
pub mod leaderboard;
pub mod play;
pub mod statistics;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use countrydle_core::{
  oracle::{LanguageModel, VectorIndex},
  store::GameStore,
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use game::Game;

/// Build the API router for `game`.
pub fn api_router<S, M, V>(game: Arc<Game<S, M, V>>) -> Router<()>
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  Router::new()
    // Play
    .route("/game/state", get(play::state::<S, M, V>))
    .route("/game/question", post(play::question::<S, M, V>))
    .route("/game/guess", post(play::guess::<S, M, V>))
    .route("/game/end", get(play::end::<S, M, V>))
    .route("/game/history", get(play::history::<S, M, V>))
    // Standing
    .route("/leaderboard", get(leaderboard::handler::<S, M, V>))
    .route("/statistics/me", get(statistics::me::<S, M, V>))
    .route("/statistics/rounds", get(statistics::rounds::<S, M, V>))
    .layer(TraceLayer::new_for_http())
    .with_state(game)
}
