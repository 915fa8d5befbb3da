//! [`SqliteStore`]: the SQLite implementation of [`GameStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, params};
use tracing::debug;
use uuid::Uuid;

use countrydle_core::{
  Error as RuleError,
  country::{Country, Fragment, NewCountry, NewFragment},
  record::{GuessRecord, NewGuess, NewQuestion, QuestionOutcome, QuestionRecord},
  round::{CountryTally, DailyRound, PastRound},
  session::GameSession,
  standing::{LeaderboardEntry, SessionSummary, UserPoints, UserStatistics},
  store::GameStore,
  user::{NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    RawGuess, RawQuestion, RawSession, RawUser, SESSION_COLUMNS, decode_count,
    decode_date, decode_dt, decode_embedding, decode_uuid, encode_date,
    encode_dt, encode_embedding, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Countrydle game store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Synchronous helpers (run inside `call`) ─────────────────────────────────

const QUESTION_COLUMNS: &str = "question_id, user_id, round_id, original, \
  question, valid, answer, explanation, context, asked_at";

const GUESS_COLUMNS: &str =
  "guess_id, user_id, round_id, guess, verdict, guessed_at";

type RawRound = (String, String, i64, String);
type RawFragment = (i64, i64, String, String);

fn load_session(
  conn: &rusqlite::Connection,
  session_id: &str,
) -> rusqlite::Result<Option<RawSession>> {
  conn
    .query_row(
      &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1"),
      [session_id],
      RawSession::from_row,
    )
    .optional()
}

fn decode_round((round_id, date, country_id, created_at): RawRound) -> Result<DailyRound> {
  Ok(DailyRound {
    round_id: decode_uuid(&round_id)?,
    date: decode_date(&date)?,
    country_id,
    created_at: decode_dt(&created_at)?,
  })
}

fn decode_fragment((fragment_id, country_id, text, embedding): RawFragment) -> Result<Fragment> {
  Ok(Fragment {
    fragment_id,
    country_id,
    text,
    embedding: decode_embedding(&embedding)?,
  })
}

fn country_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Country> {
  Ok(Country {
    country_id:    row.get(0)?,
    name:          row.get(1)?,
    official_name: row.get(2)?,
    source_text:   row.get(3)?,
  })
}

fn insert_country(
  conn: &rusqlite::Connection,
  (name, official_name, source_text): &(String, String, String),
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO countries (name, official_name, source_text) VALUES (?1, ?2, ?3)",
    params![name, official_name, source_text],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Rows are `(text, embedding json)`; ids come back in insertion order.
fn insert_fragments(
  conn: &rusqlite::Connection,
  country_id: i64,
  rows: &[(String, String)],
) -> rusqlite::Result<Vec<i64>> {
  let mut stmt = conn.prepare(
    "INSERT INTO fragments (country_id, text, embedding) VALUES (?1, ?2, ?3)",
  )?;
  let mut ids = Vec::with_capacity(rows.len());
  for (text, embedding) in rows {
    stmt.execute(params![country_id, text, embedding])?;
    ids.push(conn.last_insert_rowid());
  }
  Ok(ids)
}

fn fragment_rows(fragments: &[NewFragment]) -> Result<Vec<(String, String)>> {
  fragments
    .iter()
    .map(|f| Ok((f.text.clone(), encode_embedding(&f.embedding)?)))
    .collect()
}

fn zip_fragments(
  country_id: i64,
  ids: Vec<i64>,
  fragments: Vec<NewFragment>,
) -> Vec<Fragment> {
  ids
    .into_iter()
    .zip(fragments)
    .map(|(fragment_id, f)| Fragment {
      fragment_id,
      country_id,
      text: f.text,
      embedding: f.embedding,
    })
    .collect()
}

/// Load the session, apply the question transition and persist both the
/// quota change and the record in one immediate transaction.
fn record_question_tx(
  conn: &mut rusqlite::Connection,
  session_id: Uuid,
  input: NewQuestion,
) -> Result<(GameSession, QuestionRecord)> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let sid = encode_uuid(session_id);

  let mut session = load_session(&tx, &sid)?
    .ok_or(RuleError::SessionNotFound(session_id))?
    .into_session()?;
  let asked_before = session.questions_asked;
  let valid = input.outcome.is_valid();
  session.apply_question(valid)?;

  if valid {
    let changed = tx.execute(
      "UPDATE sessions SET remaining_questions = ?2, questions_asked = ?3
       WHERE session_id = ?1 AND is_game_over = 0 AND questions_asked = ?4",
      params![sid, session.remaining_questions, session.questions_asked, asked_before],
    )?;
    if changed != 1 {
      return Err(Error::Constraint(format!("session {session_id} changed concurrently")));
    }
  }

  let record = QuestionRecord {
    question_id: Uuid::new_v4(),
    user_id:     session.user_id,
    round_id:    session.round_id,
    original:    input.original,
    outcome:     input.outcome,
    context:     input.context,
    asked_at:    Utc::now(),
  };
  let (canonical, answer) = match &record.outcome {
    QuestionOutcome::Valid { question, answer, .. } => {
      (Some(question.as_str()), Some(answer.to_string()))
    }
    QuestionOutcome::Invalid { .. } => (None, None),
  };

  tx.execute(
    &format!(
      "INSERT INTO questions ({QUESTION_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    ),
    params![
      encode_uuid(record.question_id),
      encode_uuid(record.user_id),
      encode_uuid(record.round_id),
      record.original,
      canonical,
      valid,
      answer,
      record.outcome.explanation(),
      record.context,
      encode_dt(record.asked_at),
    ],
  )?;
  tx.commit()?;

  Ok((session, record))
}

/// Load the session, apply the guess transition, persist the record, and on
/// game over fold the outcome into the user's lifetime standing.
fn record_guess_tx(
  conn: &mut rusqlite::Connection,
  session_id: Uuid,
  input: NewGuess,
) -> Result<(GameSession, GuessRecord)> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let sid = encode_uuid(session_id);

  let mut session = load_session(&tx, &sid)?
    .ok_or(RuleError::SessionNotFound(session_id))?
    .into_session()?;
  let guesses_before = session.guesses_made;
  let finish = session.apply_guess(input.verdict)?;

  let changed = tx.execute(
    "UPDATE sessions
     SET remaining_guesses = ?2, guesses_made = ?3,
         is_game_over = ?4, won = ?5, points = ?6
     WHERE session_id = ?1 AND is_game_over = 0 AND guesses_made = ?7",
    params![
      sid,
      session.remaining_guesses,
      session.guesses_made,
      session.is_game_over,
      session.won,
      session.points,
      guesses_before,
    ],
  )?;
  if changed != 1 {
    return Err(Error::Constraint(format!("session {session_id} changed concurrently")));
  }

  let record = GuessRecord {
    guess_id:   Uuid::new_v4(),
    user_id:    session.user_id,
    round_id:   session.round_id,
    guess:      input.guess,
    verdict:    input.verdict,
    guessed_at: Utc::now(),
  };
  tx.execute(
    &format!("INSERT INTO guesses ({GUESS_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
    params![
      encode_uuid(record.guess_id),
      encode_uuid(record.user_id),
      encode_uuid(record.round_id),
      record.guess,
      record.verdict.to_string(),
      encode_dt(record.guessed_at),
    ],
  )?;

  if let Some(finish) = finish {
    tx.execute(
      "INSERT INTO user_points (user_id, points, streak) VALUES (?1, ?2, ?3)
       ON CONFLICT(user_id) DO UPDATE SET
         points = points + excluded.points,
         streak = streak + excluded.streak",
      params![encode_uuid(session.user_id), finish.points, u32::from(finish.won)],
    )?;
  }
  tx.commit()?;

  Ok((session, record))
}

// ─── GameStore impl ──────────────────────────────────────────────────────────

impl GameStore for SqliteStore {
  type Error = Error;

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn add_country(&self, input: NewCountry) -> Result<Country> {
    let NewCountry { name, official_name, source_text } = input;
    let row = (name.clone(), official_name.clone(), source_text.clone());

    let country_id = self
      .conn
      .call(move |conn| Ok(insert_country(conn, &row)?))
      .await?;

    Ok(Country { country_id, name, official_name, source_text })
  }

  async fn add_country_with_fragments(
    &self,
    input: NewCountry,
    fragments: Vec<NewFragment>,
  ) -> Result<(Country, Vec<Fragment>)> {
    let NewCountry { name, official_name, source_text } = input;
    let row = (name.clone(), official_name.clone(), source_text.clone());
    let rows = fragment_rows(&fragments)?;

    let (country_id, ids) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let country_id = insert_country(&tx, &row)?;
        let ids = insert_fragments(&tx, country_id, &rows)?;
        tx.commit()?;
        Ok((country_id, ids))
      })
      .await?;
    debug!(country_id, fragments = ids.len(), "country stored with fragments");

    let country = Country { country_id, name, official_name, source_text };
    Ok((country, zip_fragments(country_id, ids, fragments)))
  }

  async fn get_country(&self, country_id: i64) -> Result<Option<Country>> {
    let country = self
      .conn
      .call(move |conn| {
        let country = conn
          .query_row(
            "SELECT country_id, name, official_name, source_text
             FROM countries WHERE country_id = ?1",
            [country_id],
            country_from_row,
          )
          .optional()?;
        Ok(country)
      })
      .await?;
    Ok(country)
  }

  async fn list_countries(&self) -> Result<Vec<Country>> {
    let countries = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT country_id, name, official_name, source_text
           FROM countries ORDER BY country_id",
        )?;
        let rows = stmt
          .query_map([], country_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(countries)
  }

  async fn add_fragments(
    &self,
    country_id: i64,
    fragments: Vec<NewFragment>,
  ) -> Result<Vec<Fragment>> {
    let rows = fragment_rows(&fragments)?;

    let ids = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let ids = insert_fragments(&tx, country_id, &rows)?;
        tx.commit()?;
        Ok(ids)
      })
      .await?;

    Ok(zip_fragments(country_id, ids, fragments))
  }

  async fn fragments_for_country(&self, country_id: i64) -> Result<Vec<Fragment>> {
    let raws: Vec<RawFragment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT fragment_id, country_id, text, embedding
           FROM fragments WHERE country_id = ?1 ORDER BY fragment_id",
        )?;
        let rows = stmt
          .query_map([country_id], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(decode_fragment).collect()
  }

  async fn get_fragments(&self, ids: Vec<i64>) -> Result<Vec<Fragment>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let raws: Vec<RawFragment> = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT fragment_id, country_id, text, embedding
           FROM fragments WHERE fragment_id IN ({placeholders})
           ORDER BY fragment_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(ids.iter()), |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(decode_fragment).collect()
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:       Uuid::new_v4(),
      username:      input.username,
      password_hash: input.password_hash,
      verified:      input.verified,
      created_at:    Utc::now(),
    };

    let row = (
      encode_uuid(user.user_id),
      user.username.clone(),
      user.password_hash.clone(),
      user.verified,
      encode_dt(user.created_at),
    );
    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO users (user_id, username, password_hash, verified, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(username) DO NOTHING",
          params![row.0, row.1, row.2, row.3, row.4],
        )?;
        Ok(n == 1)
      })
      .await?;

    if !inserted {
      return Err(Error::UsernameTaken(user.username));
    }
    Ok(user)
  }

  async fn get_user_by_name<'a>(&'a self, username: &'a str) -> Result<Option<User>> {
    let name = username.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            "SELECT user_id, username, password_hash, verified, created_at
             FROM users WHERE username = ?1",
            [name],
            RawUser::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn list_verified_users(&self) -> Result<Vec<User>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, username, password_hash, verified, created_at
           FROM users WHERE verified = 1 ORDER BY username",
        )?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawUser::into_user).collect()
  }

  // ── Rounds ────────────────────────────────────────────────────────────────

  async fn get_round_by_date(&self, date: NaiveDate) -> Result<Option<DailyRound>> {
    let day = encode_date(date);
    let raw: Option<RawRound> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            "SELECT round_id, date, country_id, created_at
             FROM rounds WHERE date = ?1",
            [day],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
          )
          .optional()?;
        Ok(raw)
      })
      .await?;
    raw.map(decode_round).transpose()
  }

  async fn create_round(
    &self,
    date: NaiveDate,
    country_id: i64,
  ) -> Result<(DailyRound, bool)> {
    let round = DailyRound {
      round_id: Uuid::new_v4(),
      date,
      country_id,
      created_at: Utc::now(),
    };

    let row = (encode_uuid(round.round_id), encode_date(date), encode_dt(round.created_at));
    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO rounds (round_id, date, country_id, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(date) DO NOTHING",
          params![row.0, row.1, country_id, row.2],
        )?;
        Ok(n == 1)
      })
      .await?;

    if inserted {
      return Ok((round, true));
    }
    debug!(%date, "round already assigned");
    let existing = self
      .get_round_by_date(date)
      .await?
      .ok_or_else(|| Error::Constraint(format!("round for {date} not insertable")))?;
    Ok((existing, false))
  }

  async fn past_rounds(&self, before: NaiveDate) -> Result<Vec<PastRound>> {
    let day = encode_date(before);
    let raws: Vec<(String, i64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.date, c.country_id, c.name
           FROM rounds r JOIN countries c ON c.country_id = r.country_id
           WHERE r.date < ?1
           ORDER BY r.date DESC",
        )?;
        let rows = stmt
          .query_map([day], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(date, country_id, country_name)| {
        Ok(PastRound { date: decode_date(&date)?, country_id, country_name })
      })
      .collect()
  }

  async fn country_tallies(&self, before: NaiveDate) -> Result<Vec<CountryTally>> {
    let day = encode_date(before);
    let raws: Vec<(i64, String, i64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.country_id, c.name, COUNT(r.round_id) AS picks, MAX(r.date) AS last
           FROM countries c JOIN rounds r ON r.country_id = c.country_id
           WHERE r.date < ?1
           GROUP BY c.country_id, c.name
           ORDER BY picks DESC, last DESC, c.name ASC",
        )?;
        let rows = stmt
          .query_map([day], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(country_id, name, count, last)| {
        Ok(CountryTally {
          country_id,
          name,
          count: decode_count(count)?,
          last: decode_date(&last)?,
        })
      })
      .collect()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn get_session(
    &self,
    user_id: Uuid,
    round_id: Uuid,
  ) -> Result<Option<GameSession>> {
    let (uid, rid) = (encode_uuid(user_id), encode_uuid(round_id));
    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {SESSION_COLUMNS} FROM sessions
               WHERE user_id = ?1 AND round_id = ?2"
            ),
            [uid, rid],
            RawSession::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawSession::into_session).transpose()
  }

  async fn get_or_create_session(
    &self,
    user_id: Uuid,
    round_id: Uuid,
  ) -> Result<GameSession> {
    if let Some(session) = self.get_session(user_id, round_id).await? {
      return Ok(session);
    }

    let fresh = GameSession::new(user_id, round_id);
    let row = (
      encode_uuid(fresh.session_id),
      encode_uuid(user_id),
      encode_uuid(round_id),
      fresh.remaining_questions,
      fresh.remaining_guesses,
    );
    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO sessions (
             session_id, user_id, round_id, remaining_questions, remaining_guesses
           ) VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(user_id, round_id) DO NOTHING",
          params![row.0, row.1, row.2, row.3, row.4],
        )?;
        Ok(n == 1)
      })
      .await?;

    if inserted {
      debug!(%user_id, %round_id, session_id = %fresh.session_id, "session created");
      return Ok(fresh);
    }
    // A concurrent first request won the insert; its row is the session.
    self.get_session(user_id, round_id).await?.ok_or_else(|| {
      Error::Constraint(format!("session for user {user_id} round {round_id} not insertable"))
    })
  }

  async fn record_question(
    &self,
    session_id: Uuid,
    input: NewQuestion,
  ) -> Result<(GameSession, QuestionRecord)> {
    let recorded = self
      .conn
      .call(move |conn| Ok(record_question_tx(conn, session_id, input)))
      .await??;
    Ok(recorded)
  }

  async fn record_guess(
    &self,
    session_id: Uuid,
    input: NewGuess,
  ) -> Result<(GameSession, GuessRecord)> {
    let recorded = self
      .conn
      .call(move |conn| Ok(record_guess_tx(conn, session_id, input)))
      .await??;
    Ok(recorded)
  }

  async fn questions_for(
    &self,
    user_id: Uuid,
    round_id: Uuid,
  ) -> Result<Vec<QuestionRecord>> {
    let (uid, rid) = (encode_uuid(user_id), encode_uuid(round_id));
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {QUESTION_COLUMNS} FROM questions
           WHERE user_id = ?1 AND round_id = ?2
           ORDER BY asked_at, rowid"
        ))?;
        let rows = stmt
          .query_map([uid, rid], RawQuestion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawQuestion::into_record).collect()
  }

  async fn guesses_for(&self, user_id: Uuid, round_id: Uuid) -> Result<Vec<GuessRecord>> {
    let (uid, rid) = (encode_uuid(user_id), encode_uuid(round_id));
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {GUESS_COLUMNS} FROM guesses
           WHERE user_id = ?1 AND round_id = ?2
           ORDER BY guessed_at, rowid"
        ))?;
        let rows = stmt
          .query_map([uid, rid], RawGuess::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawGuess::into_record).collect()
  }

  async fn finished_sessions(&self, user_id: Uuid) -> Result<Vec<SessionSummary>> {
    let uid = encode_uuid(user_id);
    let raws: Vec<(RawSession, String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.session_id, s.user_id, s.round_id,
                  s.remaining_questions, s.remaining_guesses,
                  s.questions_asked, s.guesses_made,
                  s.is_game_over, s.won, s.points,
                  r.date, c.name
           FROM sessions s
           JOIN rounds r    ON r.round_id = s.round_id
           JOIN countries c ON c.country_id = r.country_id
           WHERE s.user_id = ?1 AND s.is_game_over = 1
           ORDER BY r.date DESC",
        )?;
        let rows = stmt
          .query_map([uid], |r| Ok((RawSession::from_row(r)?, r.get(10)?, r.get(11)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, date, country_name)| {
        Ok(SessionSummary {
          date: decode_date(&date)?,
          country_name,
          session: raw.into_session()?,
        })
      })
      .collect()
  }

  // ── Standing ──────────────────────────────────────────────────────────────

  async fn get_user_points(&self, user_id: Uuid) -> Result<UserPoints> {
    let uid = encode_uuid(user_id);
    let row: Option<(i64, i64)> = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT points, streak FROM user_points WHERE user_id = ?1",
            [uid],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        Ok(row)
      })
      .await?;

    match row {
      Some((points, streak)) => {
        Ok(UserPoints { user_id, points, streak: decode_count(streak)? })
      }
      None => Ok(UserPoints::zero(user_id)),
    }
  }

  async fn set_streak(&self, user_id: Uuid, streak: u32) -> Result<()> {
    let uid = encode_uuid(user_id);
    self
      .conn
      .call(move |conn| {
        // No row means the user never finished a game; the streak is zero.
        conn.execute(
          "UPDATE user_points SET streak = ?2 WHERE user_id = ?1",
          params![uid, streak],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn leaderboard_rows(&self) -> Result<Vec<LeaderboardEntry>> {
    let raws: Vec<(String, String, i64, i64, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT u.user_id, u.username,
                  COALESCE(p.points, 0), COALESCE(w.wins, 0), COALESCE(p.streak, 0)
           FROM users u
           LEFT JOIN user_points p ON p.user_id = u.user_id
           LEFT JOIN (
             SELECT user_id, SUM(won) AS wins FROM sessions GROUP BY user_id
           ) w ON w.user_id = u.user_id",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(user_id, username, points, wins, streak)| {
        Ok(LeaderboardEntry {
          user_id: decode_uuid(&user_id)?,
          username,
          points,
          wins: decode_count(wins)?,
          streak: decode_count(streak)?,
        })
      })
      .collect()
  }

  async fn user_statistics(&self, user_id: Uuid) -> Result<UserStatistics> {
    let uid = encode_uuid(user_id);
    let counts: [i64; 9] = self
      .conn
      .call(move |conn| {
        let counts = conn.query_row(
          "SELECT
             COALESCE((SELECT points FROM user_points WHERE user_id = ?1), 0),
             COALESCE((SELECT streak FROM user_points WHERE user_id = ?1), 0),
             (SELECT COUNT(*) FROM sessions  WHERE user_id = ?1 AND won = 1),
             (SELECT COUNT(*) FROM questions WHERE user_id = ?1 AND valid = 1),
             (SELECT COUNT(*) FROM questions WHERE user_id = ?1 AND answer = 'true'),
             (SELECT COUNT(*) FROM questions WHERE user_id = ?1 AND answer = 'false'),
             (SELECT COUNT(*) FROM guesses   WHERE user_id = ?1),
             (SELECT COUNT(*) FROM guesses   WHERE user_id = ?1 AND verdict = 'correct'),
             (SELECT COUNT(*) FROM guesses   WHERE user_id = ?1 AND verdict = 'incorrect')",
          [uid],
          |r| {
            let mut counts = [0i64; 9];
            for (i, slot) in counts.iter_mut().enumerate() {
              *slot = r.get(i)?;
            }
            Ok(counts)
          },
        )?;
        Ok(counts)
      })
      .await?;

    let [points, streak, wins, asked, yes, no, guesses, correct, incorrect] = counts;
    Ok(UserStatistics {
      points,
      streak: decode_count(streak)?,
      wins: decode_count(wins)?,
      questions_asked: decode_count(asked)?,
      questions_true: decode_count(yes)?,
      questions_false: decode_count(no)?,
      guesses_made: decode_count(guesses)?,
      guesses_correct: decode_count(correct)?,
      guesses_incorrect: decode_count(incorrect)?,
    })
  }
}
