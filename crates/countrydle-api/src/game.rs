//! [`Game`]: the player-facing operations, orchestrating the oracles and the
//! store.
//!
//! Each submission pre-checks the session before calling any oracle, so a
//! player who is out of quota or already finished does not cost an inference
//! call. The store re-checks the same rules atomically when recording.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use countrydle_core::{
  Error as RuleError,
  country::Country,
  oracle::{LanguageModel, VectorIndex},
  record::{Answer, GuessRecord, NewGuess, NewQuestion, QuestionOutcome, QuestionRecord},
  round::{CountryTally, DailyRound, PastRound},
  session::{GameSession, SessionStatus},
  standing::{self, LeaderboardEntry, SessionSummary, UserStatistics},
  store::GameStore,
  user::User,
};
use countrydle_oracle::{
  answer::answer,
  classify::{Enhanced, enhance},
  guess::judge,
  retrieve::{context, retrieve},
};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;

/// Longest question or guess accepted, in characters.
pub const MAX_INPUT_CHARS: usize = 300;

// ─── Views ───────────────────────────────────────────────────────────────────

/// A question as shown to the player. Explanations of answered questions stay
/// hidden until the game is over.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionView {
  Valid {
    original:    String,
    question:    String,
    answer:      Answer,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
  },
  Invalid {
    original:    String,
    explanation: String,
  },
}

impl QuestionView {
  pub fn new(record: QuestionRecord, reveal: bool) -> Self {
    match record.outcome {
      QuestionOutcome::Valid { question, answer, explanation } => Self::Valid {
        original: record.original,
        question,
        answer,
        explanation: reveal.then_some(explanation),
      },
      QuestionOutcome::Invalid { explanation } => Self::Invalid {
        original: record.original,
        explanation,
      },
    }
  }
}

#[derive(Debug, Serialize)]
pub struct RoundState {
  pub date:      NaiveDate,
  pub status:    SessionStatus,
  pub session:   GameSession,
  pub questions: Vec<QuestionView>,
  pub guesses:   Vec<GuessRecord>,
}

#[derive(Debug, Serialize)]
pub struct QuestionReply {
  pub question: QuestionView,
  pub session:  GameSession,
}

#[derive(Debug, Serialize)]
pub struct GuessReply {
  pub guess:   GuessRecord,
  pub status:  SessionStatus,
  pub session: GameSession,
}

/// Everything about a finished round, country included.
#[derive(Debug, Serialize)]
pub struct EndState {
  pub date:      NaiveDate,
  pub country:   Country,
  pub status:    SessionStatus,
  pub points:    i64,
  pub session:   GameSession,
  pub questions: Vec<QuestionView>,
  pub guesses:   Vec<GuessRecord>,
}

#[derive(Debug, Serialize)]
pub struct RoundStatistics {
  pub rounds:    Vec<PastRound>,
  pub countries: Vec<CountryTally>,
}

// ─── Game ────────────────────────────────────────────────────────────────────

/// Process-wide game service, shared by reference across requests.
pub struct Game<S, M, V> {
  store: Arc<S>,
  model: Arc<M>,
  index: Arc<V>,
  today: fn() -> NaiveDate,
}

fn utc_today() -> NaiveDate { Utc::now().date_naive() }

fn check_input(text: &str, what: &str) -> Result<(), ApiError> {
  if text.trim().is_empty() {
    return Err(ApiError::BadRequest(format!("{what} is empty")));
  }
  if text.chars().count() > MAX_INPUT_CHARS {
    return Err(ApiError::BadRequest(format!(
      "{what} is longer than {MAX_INPUT_CHARS} characters"
    )));
  }
  Ok(())
}

impl<S, M, V> Game<S, M, V>
where
  S: GameStore,
  M: LanguageModel,
  V: VectorIndex,
{
  pub fn new(store: Arc<S>, model: Arc<M>, index: Arc<V>) -> Self {
    Self { store, model, index, today: utc_today }
  }

  /// Replace the clock that decides which round is "today".
  pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
    self.today = today;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn today(&self) -> NaiveDate { (self.today)() }

  async fn current_round(&self) -> Result<(DailyRound, Country), ApiError> {
    let date = self.today();
    let round = self
      .store
      .get_round_by_date(date)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Rule(RuleError::NoRoundForDate(date)))?;
    let country = self
      .store
      .get_country(round.country_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| {
        ApiError::Store(format!("round {} names unknown country", round.round_id).into())
      })?;
    Ok((round, country))
  }

  async fn history_of(
    &self,
    user: &User,
    round: &DailyRound,
    reveal: bool,
  ) -> Result<(Vec<QuestionView>, Vec<GuessRecord>), ApiError> {
    let questions = self
      .store
      .questions_for(user.user_id, round.round_id)
      .await
      .map_err(ApiError::store)?
      .into_iter()
      .map(|q| QuestionView::new(q, reveal))
      .collect();
    let guesses = self
      .store
      .guesses_for(user.user_id, round.round_id)
      .await
      .map_err(ApiError::store)?;
    Ok((questions, guesses))
  }

  /// Today's session for `user` (created on first access) and its history.
  pub async fn round_state(&self, user: &User) -> Result<RoundState, ApiError> {
    let (round, _) = self.current_round().await?;
    let session = self
      .store
      .get_or_create_session(user.user_id, round.round_id)
      .await
      .map_err(ApiError::store)?;
    let (questions, guesses) = self.history_of(user, &round, session.is_game_over).await?;
    Ok(RoundState {
      date: round.date,
      status: session.status(),
      session,
      questions,
      guesses,
    })
  }

  /// Classify, answer and record a question.
  pub async fn submit_question(&self, user: &User, text: &str) -> Result<QuestionReply, ApiError> {
    check_input(text, "question")?;
    let (round, country) = self.current_round().await?;
    let session = self
      .store
      .get_or_create_session(user.user_id, round.round_id)
      .await
      .map_err(ApiError::store)?;
    session.ensure_can_ask().map_err(ApiError::Rule)?;

    let input = match enhance(self.model.as_ref(), text).await? {
      Enhanced::Valid { question } => {
        let fragments = retrieve(
          self.model.as_ref(),
          self.index.as_ref(),
          self.store.as_ref(),
          &question,
          country.country_id,
        )
        .await?;
        let facts = context(&fragments);
        let verdict = answer(self.model.as_ref(), &question, &country, &facts).await?;
        NewQuestion {
          original: text.trim().to_owned(),
          outcome:  QuestionOutcome::Valid {
            question,
            answer: verdict.answer,
            explanation: verdict.explanation,
          },
          context:  Some(facts),
        }
      }
      Enhanced::Invalid { explanation } => NewQuestion {
        original: text.trim().to_owned(),
        outcome:  QuestionOutcome::Invalid { explanation },
        context:  None,
      },
    };

    let (session, record) = self
      .store
      .record_question(session.session_id, input)
      .await
      .map_err(ApiError::store)?;
    Ok(QuestionReply {
      question: QuestionView::new(record, session.is_game_over),
      session,
    })
  }

  /// Judge and record a guess, finishing the game when it is correct or the
  /// last one.
  pub async fn submit_guess(&self, user: &User, text: &str) -> Result<GuessReply, ApiError> {
    check_input(text, "guess")?;
    let (round, country) = self.current_round().await?;
    let session = self
      .store
      .get_or_create_session(user.user_id, round.round_id)
      .await
      .map_err(ApiError::store)?;
    session.ensure_can_guess().map_err(ApiError::Rule)?;

    let verdict = judge(self.model.as_ref(), text, &country).await?;
    let (session, guess) = self
      .store
      .record_guess(session.session_id, NewGuess {
        guess: text.trim().to_owned(),
        verdict,
      })
      .await
      .map_err(ApiError::store)?;

    if session.is_game_over {
      info!(
        user = %user.username,
        won = session.won,
        points = session.points,
        "game finished"
      );
    }
    Ok(GuessReply { guess, status: session.status(), session })
  }

  /// The full picture of today's round; only once the game is over.
  pub async fn end_state(&self, user: &User) -> Result<EndState, ApiError> {
    let (round, country) = self.current_round().await?;
    let session = self
      .store
      .get_session(user.user_id, round.round_id)
      .await
      .map_err(ApiError::store)?
      .filter(|s| s.is_game_over)
      .ok_or(ApiError::GameInProgress)?;
    let (questions, guesses) = self.history_of(user, &round, true).await?;
    Ok(EndState {
      date: round.date,
      country,
      status: session.status(),
      points: session.points,
      session,
      questions,
      guesses,
    })
  }

  pub async fn history(&self, user: &User) -> Result<Vec<SessionSummary>, ApiError> {
    self
      .store
      .finished_sessions(user.user_id)
      .await
      .map_err(ApiError::store)
  }

  pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ApiError> {
    standing::leaderboard(self.store.as_ref())
      .await
      .map_err(ApiError::store)
  }

  pub async fn statistics(&self, user: &User) -> Result<UserStatistics, ApiError> {
    self
      .store
      .user_statistics(user.user_id)
      .await
      .map_err(ApiError::store)
  }

  /// Rounds before today and how often each country came up.
  pub async fn round_statistics(&self) -> Result<RoundStatistics, ApiError> {
    let today = self.today();
    let rounds = self.store.past_rounds(today).await.map_err(ApiError::store)?;
    let countries = self
      .store
      .country_tallies(today)
      .await
      .map_err(ApiError::store)?;
    Ok(RoundStatistics { rounds, countries })
  }
}
