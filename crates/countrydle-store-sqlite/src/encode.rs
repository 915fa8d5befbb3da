//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings and calendar dates are `YYYY-MM-DD`, so
//! both compare correctly as text. Embeddings are compact JSON arrays. UUIDs
//! are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use countrydle_core::{
  record::{Answer, GuessRecord, GuessVerdict, QuestionOutcome, QuestionRecord},
  session::GameSession,
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// SQLite integers are `i64`; counters never go negative.
pub fn decode_count(n: i64) -> Result<u32> {
  u32::try_from(n).map_err(|_| Error::Corrupt(format!("counter out of range: {n}")))
}

pub fn encode_embedding(v: &[f32]) -> Result<String> {
  Ok(serde_json::to_string(v)?)
}

pub fn decode_embedding(s: &str) -> Result<Vec<f32>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawSession::from_row`].
pub const SESSION_COLUMNS: &str = "session_id, user_id, round_id, \
  remaining_questions, remaining_guesses, questions_asked, guesses_made, \
  is_game_over, won, points";

pub struct RawSession {
  pub session_id:          String,
  pub user_id:             String,
  pub round_id:            String,
  pub remaining_questions: i64,
  pub remaining_guesses:   i64,
  pub questions_asked:     i64,
  pub guesses_made:        i64,
  pub is_game_over:        bool,
  pub won:                 bool,
  pub points:              i64,
}

impl RawSession {
  /// Read the leading [`SESSION_COLUMNS`] of a row.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:          row.get(0)?,
      user_id:             row.get(1)?,
      round_id:            row.get(2)?,
      remaining_questions: row.get(3)?,
      remaining_guesses:   row.get(4)?,
      questions_asked:     row.get(5)?,
      guesses_made:        row.get(6)?,
      is_game_over:        row.get(7)?,
      won:                 row.get(8)?,
      points:              row.get(9)?,
    })
  }

  pub fn into_session(self) -> Result<GameSession> {
    Ok(GameSession {
      session_id:          decode_uuid(&self.session_id)?,
      user_id:             decode_uuid(&self.user_id)?,
      round_id:            decode_uuid(&self.round_id)?,
      remaining_questions: decode_count(self.remaining_questions)?,
      remaining_guesses:   decode_count(self.remaining_guesses)?,
      questions_asked:     decode_count(self.questions_asked)?,
      guesses_made:        decode_count(self.guesses_made)?,
      is_game_over:        self.is_game_over,
      won:                 self.won,
      points:              self.points,
    })
  }
}

pub struct RawUser {
  pub user_id:       String,
  pub username:      String,
  pub password_hash: String,
  pub verified:      bool,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      verified:      row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      username:      self.username,
      password_hash: self.password_hash,
      verified:      self.verified,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// A `questions` row. `question` and `answer` are set only for valid rows.
pub struct RawQuestion {
  pub question_id: String,
  pub user_id:     String,
  pub round_id:    String,
  pub original:    String,
  pub question:    Option<String>,
  pub valid:       bool,
  pub answer:      Option<String>,
  pub explanation: String,
  pub context:     Option<String>,
  pub asked_at:    String,
}

impl RawQuestion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      question_id: row.get(0)?,
      user_id:     row.get(1)?,
      round_id:    row.get(2)?,
      original:    row.get(3)?,
      question:    row.get(4)?,
      valid:       row.get(5)?,
      answer:      row.get(6)?,
      explanation: row.get(7)?,
      context:     row.get(8)?,
      asked_at:    row.get(9)?,
    })
  }

  pub fn into_record(self) -> Result<QuestionRecord> {
    let outcome = if self.valid {
      let question = self.question.ok_or_else(|| {
        Error::Corrupt(format!("valid question {} has no canonical form", self.question_id))
      })?;
      let answer = self.answer.as_deref().ok_or_else(|| {
        Error::Corrupt(format!("valid question {} has no answer", self.question_id))
      })?;
      QuestionOutcome::Valid {
        question,
        answer: decode_answer(answer)?,
        explanation: self.explanation,
      }
    } else {
      QuestionOutcome::Invalid { explanation: self.explanation }
    };

    Ok(QuestionRecord {
      question_id: decode_uuid(&self.question_id)?,
      user_id: decode_uuid(&self.user_id)?,
      round_id: decode_uuid(&self.round_id)?,
      original: self.original,
      outcome,
      context: self.context,
      asked_at: decode_dt(&self.asked_at)?,
    })
  }
}

pub struct RawGuess {
  pub guess_id:   String,
  pub user_id:    String,
  pub round_id:   String,
  pub guess:      String,
  pub verdict:    String,
  pub guessed_at: String,
}

impl RawGuess {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      guess_id:   row.get(0)?,
      user_id:    row.get(1)?,
      round_id:   row.get(2)?,
      guess:      row.get(3)?,
      verdict:    row.get(4)?,
      guessed_at: row.get(5)?,
    })
  }

  pub fn into_record(self) -> Result<GuessRecord> {
    Ok(GuessRecord {
      guess_id:   decode_uuid(&self.guess_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      round_id:   decode_uuid(&self.round_id)?,
      guess:      self.guess,
      verdict:    decode_verdict(&self.verdict)?,
      guessed_at: decode_dt(&self.guessed_at)?,
    })
  }
}

fn decode_answer(s: &str) -> Result<Answer> {
  s.parse()
    .map_err(|_| Error::Corrupt(format!("unknown answer: {s:?}")))
}

fn decode_verdict(s: &str) -> Result<GuessVerdict> {
  s.parse()
    .map_err(|_| Error::Corrupt(format!("unknown verdict: {s:?}")))
}
