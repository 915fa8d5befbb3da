//! The per-user, per-round game session and its state machine.
//!
//! A session starts `Active` with full quotas and ends in exactly one of the
//! terminal states `Won` or `Lost`. Once terminal, no transition changes any
//! field. The store applies these transitions inside its atomic writes so the
//! rules are enforced in one place.

use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::{Error, Result, record::GuessVerdict};

/// Questions granted per round.
pub const MAX_QUESTIONS: u32 = 10;

/// Guesses granted per round.
pub const MAX_GUESSES: u32 = 3;

/// The two per-round allowances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Quota {
  Questions,
  Guesses,
}

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
  Active,
  Won,
  Lost,
}

/// One user's progress against one daily round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
  pub session_id:          Uuid,
  pub user_id:             Uuid,
  pub round_id:            Uuid,
  pub remaining_questions: u32,
  pub remaining_guesses:   u32,
  pub questions_asked:     u32,
  pub guesses_made:        u32,
  pub is_game_over:        bool,
  pub won:                 bool,
  /// Zero until the session is won; fixed from then on.
  pub points:              i64,
}

/// Emitted when a guess moves a session into a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finish {
  pub won:    bool,
  pub points: i64,
}

impl GameSession {
  /// A fresh session with full quotas.
  pub fn new(user_id: Uuid, round_id: Uuid) -> Self {
    Self {
      session_id: Uuid::new_v4(),
      user_id,
      round_id,
      remaining_questions: MAX_QUESTIONS,
      remaining_guesses: MAX_GUESSES,
      questions_asked: 0,
      guesses_made: 0,
      is_game_over: false,
      won: false,
      points: 0,
    }
  }

  pub fn status(&self) -> SessionStatus {
    match (self.is_game_over, self.won) {
      (false, _) => SessionStatus::Active,
      (true, true) => SessionStatus::Won,
      (true, false) => SessionStatus::Lost,
    }
  }

  /// Fails if another question may not be submitted.
  pub fn ensure_can_ask(&self) -> Result<()> {
    if self.is_game_over {
      return Err(Error::GameAlreadyOver);
    }
    if self.remaining_questions == 0 {
      return Err(Error::QuotaExhausted(Quota::Questions));
    }
    Ok(())
  }

  /// Fails if another guess may not be submitted.
  pub fn ensure_can_guess(&self) -> Result<()> {
    if self.is_game_over {
      return Err(Error::GameAlreadyOver);
    }
    if self.guesses_made >= MAX_GUESSES || self.remaining_guesses == 0 {
      return Err(Error::QuotaExhausted(Quota::Guesses));
    }
    Ok(())
  }

  /// Record a question. Only valid questions consume quota.
  pub fn apply_question(&mut self, valid: bool) -> Result<()> {
    self.ensure_can_ask()?;
    if valid {
      self.remaining_questions -= 1;
      self.questions_asked += 1;
    }
    Ok(())
  }

  /// Record a guess. Returns `Some` when this guess ends the game.
  pub fn apply_guess(&mut self, verdict: GuessVerdict) -> Result<Option<Finish>> {
    self.ensure_can_guess()?;
    self.guesses_made += 1;
    self.remaining_guesses -= 1;

    if verdict.is_correct() {
      self.is_game_over = true;
      self.won = true;
      self.points = points(self.remaining_questions, self.remaining_guesses);
      return Ok(Some(Finish { won: true, points: self.points }));
    }

    if self.remaining_guesses == 0 {
      self.is_game_over = true;
      self.won = false;
      return Ok(Some(Finish { won: false, points: 0 }));
    }

    Ok(None)
  }
}

/// Points for a win, from the quotas left after the winning guess.
///
/// Guesses weigh quadratically so an early correct guess dominates.
pub fn points(remaining_questions: u32, remaining_guesses: u32) -> i64 {
  let questions = i64::from(remaining_questions) * 100;
  let guesses = i64::from(remaining_guesses) + 1;
  questions + 100 * (guesses * guesses + 1)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn session() -> GameSession { GameSession::new(Uuid::new_v4(), Uuid::new_v4()) }

  fn conserved(s: &GameSession) -> bool {
    s.remaining_questions + s.questions_asked == MAX_QUESTIONS
      && s.remaining_guesses + s.guesses_made == MAX_GUESSES
  }

  #[test]
  fn points_formula_examples() {
    assert_eq!(points(9, 2), 1900);
    assert_eq!(points(0, 0), 200);
    assert_eq!(points(10, 2), 2000);
    assert!(points(9, 2) > points(0, 0));
  }

  #[test]
  fn points_decrease_as_resources_are_spent() {
    for q in 1..=MAX_QUESTIONS {
      assert!(points(q, 1) > points(q - 1, 1));
    }
    for g in 1..MAX_GUESSES {
      assert!(points(5, g) > points(5, g - 1));
    }
  }

  #[test]
  fn valid_question_consumes_quota() {
    let mut s = session();
    s.apply_question(true).unwrap();
    assert_eq!(s.remaining_questions, 9);
    assert_eq!(s.questions_asked, 1);
    assert!(conserved(&s));
  }

  #[test]
  fn invalid_questions_are_free() {
    let mut s = session();
    for _ in 0..3 {
      s.apply_question(false).unwrap();
    }
    assert_eq!(s.remaining_questions, MAX_QUESTIONS);
    assert_eq!(s.questions_asked, 0);
  }

  #[test]
  fn question_quota_runs_out() {
    let mut s = session();
    for _ in 0..MAX_QUESTIONS {
      s.apply_question(true).unwrap();
      assert!(conserved(&s));
    }
    assert_eq!(
      s.apply_question(true),
      Err(Error::QuotaExhausted(Quota::Questions))
    );
    // An exhausted question quota rejects invalid questions too.
    assert_eq!(
      s.apply_question(false),
      Err(Error::QuotaExhausted(Quota::Questions))
    );
    assert_eq!(s.status(), SessionStatus::Active);
  }

  #[test]
  fn first_guess_win_scores_and_ends_game() {
    let mut s = session();
    s.apply_question(true).unwrap();
    let finish = s.apply_guess(GuessVerdict::Correct).unwrap();
    assert_eq!(finish, Some(Finish { won: true, points: 1900 }));
    assert_eq!(s.status(), SessionStatus::Won);
    assert_eq!(s.points, 1900);
    assert!(conserved(&s));
  }

  #[test]
  fn three_wrong_guesses_lose() {
    let mut s = session();
    assert_eq!(s.apply_guess(GuessVerdict::Incorrect).unwrap(), None);
    assert_eq!(s.apply_guess(GuessVerdict::Ambiguous).unwrap(), None);
    let finish = s.apply_guess(GuessVerdict::Incorrect).unwrap();
    assert_eq!(finish, Some(Finish { won: false, points: 0 }));
    assert_eq!(s.status(), SessionStatus::Lost);
    assert_eq!(s.points, 0);
    assert!(conserved(&s));
  }

  #[test]
  fn last_guess_win_after_all_questions() {
    let mut s = session();
    for _ in 0..MAX_QUESTIONS {
      s.apply_question(true).unwrap();
    }
    s.apply_guess(GuessVerdict::Incorrect).unwrap();
    s.apply_guess(GuessVerdict::Incorrect).unwrap();
    let finish = s.apply_guess(GuessVerdict::Correct).unwrap();
    assert_eq!(finish, Some(Finish { won: true, points: 200 }));
  }

  #[test]
  fn terminal_state_is_immutable() {
    let mut s = session();
    s.apply_guess(GuessVerdict::Correct).unwrap();
    let frozen = s.clone();

    assert_eq!(s.apply_question(true), Err(Error::GameAlreadyOver));
    assert_eq!(s.apply_question(false), Err(Error::GameAlreadyOver));
    assert_eq!(s.apply_guess(GuessVerdict::Correct), Err(Error::GameAlreadyOver));
    assert_eq!(s, frozen);
  }

  #[test]
  fn guess_cap_is_checked_independently_of_game_over() {
    let mut s = session();
    s.guesses_made = MAX_GUESSES;
    s.remaining_guesses = 0;
    assert_eq!(s.ensure_can_guess(), Err(Error::QuotaExhausted(Quota::Guesses)));
  }
}
