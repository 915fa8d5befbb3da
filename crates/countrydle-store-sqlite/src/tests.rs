//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use countrydle_core::{
  Error as RuleError,
  country::{Country, NewCountry, NewFragment},
  record::{Answer, GuessVerdict, NewGuess, NewQuestion, QuestionOutcome},
  round::DailyRound,
  schedule::{ensure_rounds, nightly_streak_check},
  session::{GameSession, MAX_GUESSES, MAX_QUESTIONS, Quota, SessionStatus},
  standing::leaderboard,
  store::{GameStore, StoreError},
  user::{NewUser, User},
};
use rand::{SeedableRng, rngs::StdRng};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, d).unwrap() }

async fn country(s: &SqliteStore, name: &str) -> Country {
  s.add_country(NewCountry {
    name:          name.into(),
    official_name: format!("Republic of {name}"),
    source_text:   format!("{name} is a country."),
  })
  .await
  .unwrap()
}

async fn user(s: &SqliteStore, name: &str, verified: bool) -> User {
  s.add_user(NewUser {
    username: name.into(),
    password_hash: "$argon2id$placeholder".into(),
    verified,
  })
  .await
  .unwrap()
}

fn valid(answer: Answer) -> NewQuestion {
  NewQuestion {
    original: "is it in europe".into(),
    outcome:  QuestionOutcome::Valid {
      question:    "Is the country located in Europe?".into(),
      answer,
      explanation: "Stated in the facts.".into(),
    },
    context:  Some("[ facts ]".into()),
  }
}

fn invalid() -> NewQuestion {
  NewQuestion {
    original: "what is its capital".into(),
    outcome:  QuestionOutcome::Invalid {
      explanation: "Not a yes/no question.".into(),
    },
    context:  None,
  }
}

fn guess(verdict: GuessVerdict) -> NewGuess {
  NewGuess { guess: "somewhere".into(), verdict }
}

/// A session for `user` on the round at `date`, creating the round if needed.
async fn session_on(
  s: &SqliteStore,
  user: &User,
  date: NaiveDate,
  country_id: i64,
) -> (DailyRound, GameSession) {
  let (round, _) = s.create_round(date, country_id).await.unwrap();
  let session = s
    .get_or_create_session(user.user_id, round.round_id)
    .await
    .unwrap();
  (round, session)
}

/// Ask `questions` valid questions and then guess correctly.
async fn win(s: &SqliteStore, session: &GameSession, questions: u32) -> GameSession {
  for _ in 0..questions {
    s.record_question(session.session_id, valid(Answer::True))
      .await
      .unwrap();
  }
  let (after, _) = s
    .record_guess(session.session_id, guess(GuessVerdict::Correct))
    .await
    .unwrap();
  after
}

async fn streak(s: &SqliteStore, u: &User) -> u32 {
  s.get_user_points(u.user_id).await.unwrap().streak
}

fn rule(e: &Error) -> Option<&RuleError> { e.as_rule() }

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_list_countries() {
  let s = store().await;
  let nl = country(&s, "Netherlands").await;
  country(&s, "Poland").await;

  let all = s.list_countries().await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].name, "Netherlands");

  let fetched = s.get_country(nl.country_id).await.unwrap().unwrap();
  assert_eq!(fetched, nl);
  assert!(s.get_country(9999).await.unwrap().is_none());
}

#[tokio::test]
async fn fragments_keep_embeddings_and_id_order() {
  let s = store().await;
  let pl = country(&s, "Poland").await;
  let added = s
    .add_fragments(pl.country_id, vec![
      NewFragment { text: "first".into(), embedding: vec![0.5, -1.0] },
      NewFragment { text: "second".into(), embedding: vec![0.25, 2.0] },
    ])
    .await
    .unwrap();
  assert_eq!(added.len(), 2);
  assert!(added[0].fragment_id < added[1].fragment_id);

  let ids = vec![added[1].fragment_id, 4242, added[0].fragment_id];
  let fetched = s.get_fragments(ids).await.unwrap();
  assert_eq!(fetched, added);

  let by_country = s.fragments_for_country(pl.country_id).await.unwrap();
  assert_eq!(by_country[1].embedding, vec![0.25, 2.0]);
  assert!(s.get_fragments(Vec::new()).await.unwrap().is_empty());
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn country_and_fragments_are_stored_together() {
  let s = store().await;
  let (chile, added) = s
    .add_country_with_fragments(
      NewCountry {
        name:          "Chile".into(),
        official_name: "Republic of Chile".into(),
        source_text:   "Chile is long and narrow.".into(),
      },
      vec![
        NewFragment { text: "long".into(), embedding: vec![1.0, 0.0] },
        NewFragment { text: "narrow".into(), embedding: vec![0.0, 1.0] },
      ],
    )
    .await
    .unwrap();

  assert_eq!(s.list_countries().await.unwrap(), vec![chile.clone()]);
  assert!(added.iter().all(|f| f.country_id == chile.country_id));
  let stored = s.fragments_for_country(chile.country_id).await.unwrap();
  assert_eq!(stored, added);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
  let s = store().await;
  user(&s, "alice", true).await;
  let err = s
    .add_user(NewUser {
      username:      "alice".into(),
      password_hash: "x".into(),
      verified:      false,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UsernameTaken(name) if name == "alice"));
}

#[tokio::test]
async fn verified_users_only() {
  let s = store().await;
  user(&s, "alice", true).await;
  user(&s, "bob", false).await;

  let verified = s.list_verified_users().await.unwrap();
  assert_eq!(verified.len(), 1);
  assert_eq!(verified[0].username, "alice");

  let bob = s.get_user_by_name("bob").await.unwrap().unwrap();
  assert!(!bob.verified);
  assert!(s.get_user_by_name("carol").await.unwrap().is_none());
}

// ─── Rounds ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_round_never_replaces_an_existing_date() {
  let s = store().await;
  let a = country(&s, "Austria").await;
  let b = country(&s, "Belgium").await;

  let (first, created) = s.create_round(day(1), a.country_id).await.unwrap();
  assert!(created);
  let (second, created) = s.create_round(day(1), b.country_id).await.unwrap();
  assert!(!created);
  assert_eq!(second, first);
}

#[tokio::test]
async fn ensure_rounds_fills_horizon_once() {
  let s = store().await;
  for name in ["Austria", "Belgium", "Chile"] {
    country(&s, name).await;
  }
  let mut rng = StdRng::seed_from_u64(7);

  let created = ensure_rounds(&s, day(10), 5, &mut rng).await.unwrap();
  assert_eq!(created.len(), 5);

  let mut snapshot = Vec::new();
  for d in 10..15 {
    snapshot.push(s.get_round_by_date(day(d)).await.unwrap().unwrap());
  }
  assert!(s.get_round_by_date(day(15)).await.unwrap().is_none());

  let again = ensure_rounds(&s, day(10), 5, &mut rng).await.unwrap();
  assert!(again.is_empty());
  for (d, before) in (10..15).zip(&snapshot) {
    assert_eq!(&s.get_round_by_date(day(d)).await.unwrap().unwrap(), before);
  }
}

#[tokio::test]
async fn ensure_rounds_keeps_existing_assignment() {
  let s = store().await;
  let a = country(&s, "Austria").await;
  country(&s, "Belgium").await;
  let (today, _) = s.create_round(day(10), a.country_id).await.unwrap();

  let mut rng = StdRng::seed_from_u64(1);
  let created = ensure_rounds(&s, day(10), 3, &mut rng).await.unwrap();
  assert_eq!(created.len(), 2);
  assert_eq!(s.get_round_by_date(day(10)).await.unwrap().unwrap(), today);
}

#[tokio::test]
async fn ensure_rounds_requires_a_catalog() {
  let s = store().await;
  let mut rng = StdRng::seed_from_u64(1);
  let err = ensure_rounds(&s, day(10), 5, &mut rng).await.unwrap_err();
  assert_eq!(rule(&err), Some(&RuleError::NoCountriesSeeded));
}

#[tokio::test]
async fn round_history_and_tallies() {
  let s = store().await;
  let a = country(&s, "Austria").await;
  let b = country(&s, "Belgium").await;
  s.create_round(day(1), a.country_id).await.unwrap();
  s.create_round(day(2), b.country_id).await.unwrap();
  s.create_round(day(3), a.country_id).await.unwrap();

  let past = s.past_rounds(day(3)).await.unwrap();
  let dates: Vec<_> = past.iter().map(|r| r.date).collect();
  assert_eq!(dates, [day(2), day(1)]);
  assert_eq!(past[0].country_name, "Belgium");

  let tallies = s.country_tallies(day(4)).await.unwrap();
  assert_eq!(tallies.len(), 2);
  assert_eq!(tallies[0].name, "Austria");
  assert_eq!(tallies[0].count, 2);
  assert_eq!(tallies[0].last, day(3));
  assert_eq!(tallies[1].count, 1);
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_first_requests_share_one_session() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (round, _) = s.create_round(day(1), c.country_id).await.unwrap();

  let (x, y) = tokio::join!(
    s.get_or_create_session(u.user_id, round.round_id),
    s.get_or_create_session(u.user_id, round.round_id),
  );
  let (x, y) = (x.unwrap(), y.unwrap());
  assert_eq!(x.session_id, y.session_id);
  assert_eq!(x.remaining_questions, MAX_QUESTIONS);
  assert_eq!(x.remaining_guesses, MAX_GUESSES);
}

#[tokio::test]
async fn invalid_questions_are_stored_but_free() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (round, session) = session_on(&s, &u, day(1), c.country_id).await;

  for _ in 0..3 {
    s.record_question(session.session_id, invalid()).await.unwrap();
  }

  let after = s.get_session(u.user_id, round.round_id).await.unwrap().unwrap();
  assert_eq!(after.remaining_questions, MAX_QUESTIONS);
  assert_eq!(after.questions_asked, 0);

  let history = s.questions_for(u.user_id, round.round_id).await.unwrap();
  assert_eq!(history.len(), 3);
  assert!(history.iter().all(|q| !q.outcome.is_valid()));
}

#[tokio::test]
async fn question_quota_is_enforced_without_storing() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (round, session) = session_on(&s, &u, day(1), c.country_id).await;

  for i in 0..MAX_QUESTIONS {
    let (after, record) = s
      .record_question(session.session_id, valid(Answer::False))
      .await
      .unwrap();
    assert_eq!(after.remaining_questions, MAX_QUESTIONS - i - 1);
    assert_eq!(record.outcome.answer(), Some(Answer::False));
  }

  let err = s
    .record_question(session.session_id, valid(Answer::True))
    .await
    .unwrap_err();
  assert_eq!(rule(&err), Some(&RuleError::QuotaExhausted(Quota::Questions)));

  let err = s.record_question(session.session_id, invalid()).await.unwrap_err();
  assert_eq!(rule(&err), Some(&RuleError::QuotaExhausted(Quota::Questions)));

  let history = s.questions_for(u.user_id, round.round_id).await.unwrap();
  assert_eq!(history.len(), MAX_QUESTIONS as usize);
}

#[tokio::test(flavor = "multi_thread")]
async fn racing_last_questions_consume_one_slot() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (round, session) = session_on(&s, &u, day(1), c.country_id).await;
  for _ in 1..MAX_QUESTIONS {
    s.record_question(session.session_id, valid(Answer::True))
      .await
      .unwrap();
  }

  let (x, y) = tokio::join!(
    s.record_question(session.session_id, valid(Answer::True)),
    s.record_question(session.session_id, valid(Answer::False)),
  );
  let (ok, err) = match (x, y) {
    (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
    other => panic!("expected exactly one success, got {other:?}"),
  };
  assert_eq!(rule(&err), Some(&RuleError::QuotaExhausted(Quota::Questions)));
  assert_eq!(ok.0.remaining_questions, 0);

  let stored = s.get_session(u.user_id, round.round_id).await.unwrap().unwrap();
  assert_eq!(stored.remaining_questions, 0);
  assert_eq!(stored.questions_asked, MAX_QUESTIONS);
  let history = s.questions_for(u.user_id, round.round_id).await.unwrap();
  assert_eq!(history.len(), MAX_QUESTIONS as usize);
}

#[tokio::test(flavor = "multi_thread")]
async fn racing_last_guesses_finish_once() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (round, session) = session_on(&s, &u, day(1), c.country_id).await;
  for _ in 1..MAX_GUESSES {
    s.record_guess(session.session_id, guess(GuessVerdict::Incorrect))
      .await
      .unwrap();
  }

  let (x, y) = tokio::join!(
    s.record_guess(session.session_id, guess(GuessVerdict::Correct)),
    s.record_guess(session.session_id, guess(GuessVerdict::Correct)),
  );
  let (ok, err) = match (x, y) {
    (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
    other => panic!("expected exactly one success, got {other:?}"),
  };
  assert_eq!(rule(&err), Some(&RuleError::GameAlreadyOver));
  assert_eq!(ok.0.status(), SessionStatus::Won);

  let stored = s.get_session(u.user_id, round.round_id).await.unwrap().unwrap();
  assert_eq!(stored.guesses_made, MAX_GUESSES);
  assert_eq!(stored.remaining_guesses, 0);
  assert_eq!(stored.guesses_made + stored.remaining_guesses, MAX_GUESSES);
  assert_eq!(stored.points, 1200);
  assert_eq!(s.guesses_for(u.user_id, round.round_id).await.unwrap().len(), 3);

  let standing = s.get_user_points(u.user_id).await.unwrap();
  assert_eq!((standing.points, standing.streak), (1200, 1));
}

#[tokio::test]
async fn first_guess_win_scores_and_extends_streak() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (_, session) = session_on(&s, &u, day(1), c.country_id).await;

  let after = win(&s, &session, 1).await;
  assert_eq!(after.status(), SessionStatus::Won);
  assert_eq!(after.points, 1900);

  let standing = s.get_user_points(u.user_id).await.unwrap();
  assert_eq!(standing.points, 1900);
  assert_eq!(standing.streak, 1);
}

#[tokio::test]
async fn finished_session_is_immutable() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (round, session) = session_on(&s, &u, day(1), c.country_id).await;
  let finished = win(&s, &session, 0).await;

  let err = s
    .record_guess(session.session_id, guess(GuessVerdict::Correct))
    .await
    .unwrap_err();
  assert_eq!(rule(&err), Some(&RuleError::GameAlreadyOver));
  let err = s.record_question(session.session_id, invalid()).await.unwrap_err();
  assert_eq!(rule(&err), Some(&RuleError::GameAlreadyOver));

  let stored = s.get_session(u.user_id, round.round_id).await.unwrap().unwrap();
  assert_eq!(stored, finished);
  assert_eq!(s.guesses_for(u.user_id, round.round_id).await.unwrap().len(), 1);
  assert_eq!(s.get_user_points(u.user_id).await.unwrap().points, finished.points);
}

#[tokio::test]
async fn three_misses_lose_with_zero_points() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (round, session) = session_on(&s, &u, day(1), c.country_id).await;

  for verdict in [GuessVerdict::Incorrect, GuessVerdict::Ambiguous, GuessVerdict::Incorrect] {
    s.record_guess(session.session_id, guess(verdict)).await.unwrap();
  }

  let lost = s.get_session(u.user_id, round.round_id).await.unwrap().unwrap();
  assert_eq!(lost.status(), SessionStatus::Lost);
  assert_eq!(lost.points, 0);
  assert_eq!(lost.remaining_guesses, 0);

  let standing = s.get_user_points(u.user_id).await.unwrap();
  assert_eq!((standing.points, standing.streak), (0, 0));

  let guesses = s.guesses_for(u.user_id, round.round_id).await.unwrap();
  assert_eq!(guesses[1].verdict, GuessVerdict::Ambiguous);
}

#[tokio::test]
async fn unknown_session_is_reported() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.record_question(id, invalid()).await.unwrap_err();
  assert_eq!(rule(&err), Some(&RuleError::SessionNotFound(id)));
}

#[tokio::test]
async fn finished_sessions_newest_first() {
  let s = store().await;
  let a = country(&s, "Austria").await;
  let b = country(&s, "Belgium").await;
  let u = user(&s, "alice", true).await;

  let (_, first) = session_on(&s, &u, day(1), a.country_id).await;
  win(&s, &first, 2).await;
  let (_, second) = session_on(&s, &u, day(2), b.country_id).await;
  win(&s, &second, 0).await;
  // Unfinished sessions are not history.
  session_on(&s, &u, day(3), a.country_id).await;

  let summaries = s.finished_sessions(u.user_id).await.unwrap();
  let names: Vec<_> = summaries.iter().map(|x| x.country_name.as_str()).collect();
  assert_eq!(names, ["Belgium", "Austria"]);
  assert!(summaries.iter().all(|x| x.session.won));
}

// ─── Standing ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn nightly_check_resets_everyone_who_did_not_win() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let winner = user(&s, "alice", true).await;
  let loser = user(&s, "bob", true).await;
  let absent = user(&s, "carol", true).await;
  let unverified = user(&s, "dave", false).await;

  // Everyone starts with a one-day streak from day 1.
  for u in [&winner, &loser, &absent, &unverified] {
    let (_, session) = session_on(&s, u, day(1), c.country_id).await;
    win(&s, &session, 0).await;
  }

  let (_, session) = session_on(&s, &winner, day(2), c.country_id).await;
  win(&s, &session, 0).await;
  let (_, session) = session_on(&s, &loser, day(2), c.country_id).await;
  for _ in 0..MAX_GUESSES {
    s.record_guess(session.session_id, guess(GuessVerdict::Incorrect))
      .await
      .unwrap();
  }

  let report = nightly_streak_check(&s, day(3)).await.unwrap();
  assert_eq!(report.checked, 3);
  assert_eq!(report.reset, 2);
  assert!(!report.missing_round);

  assert_eq!(streak(&s, &winner).await, 2);
  assert_eq!(streak(&s, &loser).await, 0);
  assert_eq!(streak(&s, &absent).await, 0);
  assert_eq!(streak(&s, &unverified).await, 1);
}

#[tokio::test]
async fn nightly_check_rerun_keeps_todays_win() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (_, session) = session_on(&s, &u, day(1), c.country_id).await;
  win(&s, &session, 0).await;
  // Day 2 is missed.
  s.create_round(day(2), c.country_id).await.unwrap();

  let report = nightly_streak_check(&s, day(3)).await.unwrap();
  assert_eq!(report.reset, 1);
  assert_eq!(streak(&s, &u).await, 0);

  let (_, session) = session_on(&s, &u, day(3), c.country_id).await;
  win(&s, &session, 0).await;
  assert_eq!(streak(&s, &u).await, 1);

  // A restart later the same day runs the check again.
  nightly_streak_check(&s, day(3)).await.unwrap();
  assert_eq!(streak(&s, &u).await, 1);
}

#[tokio::test]
async fn nightly_check_after_an_early_win_counts_only_today() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (_, session) = session_on(&s, &u, day(1), c.country_id).await;
  win(&s, &session, 0).await;
  s.create_round(day(2), c.country_id).await.unwrap();
  // Today's game is won before the check has run.
  let (_, session) = session_on(&s, &u, day(3), c.country_id).await;
  win(&s, &session, 0).await;
  assert_eq!(streak(&s, &u).await, 2);

  nightly_streak_check(&s, day(3)).await.unwrap();
  assert_eq!(streak(&s, &u).await, 1);
  nightly_streak_check(&s, day(3)).await.unwrap();
  assert_eq!(streak(&s, &u).await, 1);
}

#[tokio::test]
async fn nightly_check_without_yesterday_changes_nothing() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (_, session) = session_on(&s, &u, day(1), c.country_id).await;
  win(&s, &session, 0).await;

  let report = nightly_streak_check(&s, day(5)).await.unwrap();
  assert!(report.missing_round);
  assert_eq!(report.checked, 0);
  assert_eq!(s.get_user_points(u.user_id).await.unwrap().streak, 1);
}

#[tokio::test]
async fn leaderboard_orders_by_points_and_lists_idle_users() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let a = user(&s, "a", true).await;
  let b = user(&s, "b", true).await;
  user(&s, "c", true).await;

  let (_, session) = session_on(&s, &a, day(1), c.country_id).await;
  win(&s, &session, 5).await;
  let (_, session) = session_on(&s, &b, day(1), c.country_id).await;
  win(&s, &session, 0).await;

  let board = leaderboard(&s).await.unwrap();
  let names: Vec<_> = board.iter().map(|e| e.username.as_str()).collect();
  assert_eq!(names, ["b", "a", "c"]);
  assert_eq!(board[0].points, 2000);
  assert_eq!(board[1].points, 1500);
  assert_eq!((board[2].points, board[2].wins, board[2].streak), (0, 0, 0));
}

#[tokio::test]
async fn statistics_count_valid_questions_and_verdicts() {
  let s = store().await;
  let c = country(&s, "Chile").await;
  let u = user(&s, "alice", true).await;
  let (_, session) = session_on(&s, &u, day(1), c.country_id).await;

  s.record_question(session.session_id, valid(Answer::True)).await.unwrap();
  s.record_question(session.session_id, valid(Answer::False)).await.unwrap();
  s.record_question(session.session_id, invalid()).await.unwrap();
  s.record_guess(session.session_id, guess(GuessVerdict::Incorrect))
    .await
    .unwrap();
  s.record_guess(session.session_id, guess(GuessVerdict::Correct))
    .await
    .unwrap();

  let stats = s.user_statistics(u.user_id).await.unwrap();
  assert_eq!(stats.points, 1300);
  assert_eq!(stats.wins, 1);
  assert_eq!(stats.streak, 1);
  assert_eq!(stats.questions_asked, 2);
  assert_eq!((stats.questions_true, stats.questions_false), (1, 1));
  assert_eq!(stats.guesses_made, 2);
  assert_eq!((stats.guesses_correct, stats.guesses_incorrect), (1, 1));
}
