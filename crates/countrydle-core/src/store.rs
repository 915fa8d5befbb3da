//! The `GameStore` trait: the abstract relational data store.
//!
//! The trait is implemented by storage backends (e.g.
//! `countrydle-store-sqlite`). Session correctness depends on the store: the
//! get-or-create path must be insert-if-absent, and the question and guess
//! writes must re-check the session rules and update quotas atomically.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  country::{Country, Fragment, NewCountry, NewFragment},
  record::{GuessRecord, NewGuess, NewQuestion, QuestionRecord},
  round::{CountryTally, DailyRound, PastRound},
  session::GameSession,
  standing::{LeaderboardEntry, SessionSummary, UserPoints, UserStatistics},
  user::{NewUser, User},
};

/// Error bound for store backends.
///
/// Rule violations detected inside an atomic write travel back through the
/// backend's error type; `as_rule` recovers them so callers can answer with
/// a player-facing error rather than a server failure.
pub trait StoreError:
  std::error::Error + From<crate::Error> + Send + Sync + 'static
{
  fn as_rule(&self) -> Option<&crate::Error>;
}

/// Abstraction over the game's persistent state.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait GameStore: Send + Sync {
  type Error: StoreError;

  // ── Catalog ───────────────────────────────────────────────────────────

  fn add_country(
    &self,
    input: NewCountry,
  ) -> impl Future<Output = Result<Country, Self::Error>> + Send + '_;

  /// Insert a country together with its fragments in one transaction, so
  /// a country is never stored without them.
  fn add_country_with_fragments(
    &self,
    input: NewCountry,
    fragments: Vec<NewFragment>,
  ) -> impl Future<Output = Result<(Country, Vec<Fragment>), Self::Error>> + Send + '_;

  fn get_country(
    &self,
    country_id: i64,
  ) -> impl Future<Output = Result<Option<Country>, Self::Error>> + Send + '_;

  fn list_countries(
    &self,
  ) -> impl Future<Output = Result<Vec<Country>, Self::Error>> + Send + '_;

  /// Append fragments for a country; returned in id order.
  fn add_fragments(
    &self,
    country_id: i64,
    fragments: Vec<NewFragment>,
  ) -> impl Future<Output = Result<Vec<Fragment>, Self::Error>> + Send + '_;

  fn fragments_for_country(
    &self,
    country_id: i64,
  ) -> impl Future<Output = Result<Vec<Fragment>, Self::Error>> + Send + '_;

  /// Fetch fragments by id, in ascending id order. Unknown ids are skipped.
  fn get_fragments(
    &self,
    ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<Fragment>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user_by_name<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn list_verified_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Rounds ────────────────────────────────────────────────────────────

  fn get_round_by_date(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<DailyRound>, Self::Error>> + Send + '_;

  /// Assign `country_id` to `date` unless the date already has a round, in
  /// which case the existing round is returned unchanged. The boolean is
  /// `true` when this call created the round.
  fn create_round(
    &self,
    date: NaiveDate,
    country_id: i64,
  ) -> impl Future<Output = Result<(DailyRound, bool), Self::Error>> + Send + '_;

  /// Rounds strictly before `date`, newest first.
  fn past_rounds(
    &self,
    before: NaiveDate,
  ) -> impl Future<Output = Result<Vec<PastRound>, Self::Error>> + Send + '_;

  /// How often each country was picked for rounds strictly before `date`,
  /// by count desc, last date desc, name asc.
  fn country_tallies(
    &self,
    before: NaiveDate,
  ) -> impl Future<Output = Result<Vec<CountryTally>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn get_session(
    &self,
    user_id: Uuid,
    round_id: Uuid,
  ) -> impl Future<Output = Result<Option<GameSession>, Self::Error>> + Send + '_;

  /// Return the session for (user, round), creating it with full quotas if
  /// absent. Concurrent callers observe the same session.
  fn get_or_create_session(
    &self,
    user_id: Uuid,
    round_id: Uuid,
  ) -> impl Future<Output = Result<GameSession, Self::Error>> + Send + '_;

  /// Store a question and, for valid questions, consume one question, in one
  /// atomic step. Fails with `GameAlreadyOver` / `QuotaExhausted` without
  /// storing anything.
  fn record_question(
    &self,
    session_id: Uuid,
    input: NewQuestion,
  ) -> impl Future<Output = Result<(GameSession, QuestionRecord), Self::Error>>
  + Send
  + '_;

  /// Store a guess, consume one guess, and resolve win/loss, in one atomic
  /// step. On the transition into game over, the session's points are added
  /// to the user's lifetime total and a win extends the streak.
  fn record_guess(
    &self,
    session_id: Uuid,
    input: NewGuess,
  ) -> impl Future<Output = Result<(GameSession, GuessRecord), Self::Error>>
  + Send
  + '_;

  /// Questions for (user, round), oldest first.
  fn questions_for(
    &self,
    user_id: Uuid,
    round_id: Uuid,
  ) -> impl Future<Output = Result<Vec<QuestionRecord>, Self::Error>> + Send + '_;

  /// Guesses for (user, round), oldest first.
  fn guesses_for(
    &self,
    user_id: Uuid,
    round_id: Uuid,
  ) -> impl Future<Output = Result<Vec<GuessRecord>, Self::Error>> + Send + '_;

  /// The user's finished sessions, newest round first.
  fn finished_sessions(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SessionSummary>, Self::Error>> + Send + '_;

  // ── Standing ──────────────────────────────────────────────────────────

  /// Lifetime points for a user; zeroes if the user never finished a game.
  fn get_user_points(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<UserPoints, Self::Error>> + Send + '_;

  /// Overwrite a user's streak. A user who never finished a game keeps the
  /// implicit zero.
  fn set_streak(
    &self,
    user_id: Uuid,
    streak: u32,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// One row per user (users without points included as zeroes), unordered.
  fn leaderboard_rows(
    &self,
  ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, Self::Error>> + Send + '_;

  fn user_statistics(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<UserStatistics, Self::Error>> + Send + '_;
}
