//! Error types for `countrydle-core`.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::session::Quota;

/// Game-rule violations and fatal configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("no {0} remaining for this round")]
  QuotaExhausted(Quota),

  #[error("the game for this round is already over")]
  GameAlreadyOver,

  #[error("the country catalog is empty; seed it before starting")]
  NoCountriesSeeded,

  #[error("no round scheduled for {0}")]
  NoRoundForDate(NaiveDate),

  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("malformed oracle output: {0}")]
  MalformedOracleOutput(String),

  #[error("unknown verdict: {0:?}")]
  UnknownVerdict(String),
}

impl Error {
  /// Whether the error is the player's fault (a 4xx-class outcome).
  pub fn is_player_error(&self) -> bool {
    matches!(self, Self::QuotaExhausted(_) | Self::GameAlreadyOver)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
