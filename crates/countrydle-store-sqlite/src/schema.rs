//! SQL schema for the Countrydle SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- The catalog is seeded once and never mutated.
CREATE TABLE IF NOT EXISTS countries (
    country_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    official_name TEXT NOT NULL,
    source_text   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fragments (
    fragment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_id  INTEGER NOT NULL REFERENCES countries(country_id),
    text        TEXT NOT NULL,
    embedding   TEXT NOT NULL          -- JSON array of f32
);

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    verified      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

-- At most one round per calendar date; a round is never updated.
CREATE TABLE IF NOT EXISTS rounds (
    round_id   TEXT PRIMARY KEY,
    date       TEXT NOT NULL UNIQUE,   -- YYYY-MM-DD
    country_id INTEGER NOT NULL REFERENCES countries(country_id),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id          TEXT PRIMARY KEY,
    user_id             TEXT NOT NULL REFERENCES users(user_id),
    round_id            TEXT NOT NULL REFERENCES rounds(round_id),
    remaining_questions INTEGER NOT NULL CHECK (remaining_questions >= 0),
    remaining_guesses   INTEGER NOT NULL CHECK (remaining_guesses >= 0),
    questions_asked     INTEGER NOT NULL DEFAULT 0,
    guesses_made        INTEGER NOT NULL DEFAULT 0,
    is_game_over        INTEGER NOT NULL DEFAULT 0,
    won                 INTEGER NOT NULL DEFAULT 0,
    points              INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user_id, round_id)
);

-- Questions and guesses are strictly append-only.
CREATE TABLE IF NOT EXISTS questions (
    question_id TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(user_id),
    round_id    TEXT NOT NULL REFERENCES rounds(round_id),
    original    TEXT NOT NULL,
    question    TEXT,                  -- canonical form; NULL when invalid
    valid       INTEGER NOT NULL,
    answer      TEXT,                  -- 'true' | 'false' | 'unknown'; NULL when invalid
    explanation TEXT NOT NULL,
    context     TEXT,
    asked_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS guesses (
    guess_id   TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    round_id   TEXT NOT NULL REFERENCES rounds(round_id),
    guess      TEXT NOT NULL,
    verdict    TEXT NOT NULL,          -- 'correct' | 'incorrect' | 'ambiguous'
    guessed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_points (
    user_id TEXT PRIMARY KEY REFERENCES users(user_id),
    points  INTEGER NOT NULL DEFAULT 0,
    streak  INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS fragments_country_idx ON fragments(country_id);
CREATE INDEX IF NOT EXISTS questions_play_idx    ON questions(user_id, round_id);
CREATE INDEX IF NOT EXISTS guesses_play_idx      ON guesses(user_id, round_id);

PRAGMA user_version = 1;
";
