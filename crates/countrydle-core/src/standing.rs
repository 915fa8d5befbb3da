//! Player standing: lifetime points, streaks, leaderboard and statistics.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{session::GameSession, store::GameStore};

/// Lifetime aggregate for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoints {
  pub user_id: Uuid,
  pub points:  i64,
  /// Consecutive calendar days won, ending with the latest finished round.
  pub streak:  u32,
}

impl UserPoints {
  pub fn zero(user_id: Uuid) -> Self { Self { user_id, points: 0, streak: 0 } }
}

/// One row of the leaderboard: a read-only projection, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  pub user_id:  Uuid,
  pub username: String,
  pub points:   i64,
  pub wins:     u32,
  pub streak:   u32,
}

impl LeaderboardEntry {
  /// Leaderboard order: points, then wins, then streak (all descending), then
  /// user id ascending so equal standings always list in the same order.
  pub fn standing_cmp(&self, other: &Self) -> Ordering {
    other
      .points
      .cmp(&self.points)
      .then_with(|| other.wins.cmp(&self.wins))
      .then_with(|| other.streak.cmp(&self.streak))
      .then_with(|| self.user_id.cmp(&other.user_id))
  }
}

/// Sort leaderboard rows into their display order.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
  entries.sort_by(LeaderboardEntry::standing_cmp);
  entries
}

/// The full leaderboard in display order. Users who never scored are listed
/// with zeroes.
pub async fn leaderboard<S: GameStore>(
  store: &S,
) -> Result<Vec<LeaderboardEntry>, S::Error> {
  Ok(rank(store.leaderboard_rows().await?))
}

/// Lifetime statistics for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatistics {
  pub points:            i64,
  pub streak:            u32,
  pub wins:              u32,
  /// Valid questions only; rejected questions are not counted.
  pub questions_asked:   u32,
  pub questions_true:    u32,
  pub questions_false:   u32,
  pub guesses_made:      u32,
  pub guesses_correct:   u32,
  pub guesses_incorrect: u32,
}

/// A finished session together with the round it belonged to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
  pub date:         NaiveDate,
  pub country_name: String,
  pub session:      GameSession,
}
