//! Daily round scheduling and the nightly streak check.
//!
//! Both jobs are idempotent and run once at startup and then once a day.

use chrono::NaiveDate;
use rand::{Rng, seq::SliceRandom};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{Error, round::DailyRound, store::GameStore};

/// Number of days ahead for which rounds are kept scheduled.
pub const DEFAULT_HORIZON_DAYS: u32 = 5;

/// The round for `date`, if one has been scheduled.
pub async fn get_round_for_date<S: GameStore>(
  store: &S,
  date: NaiveDate,
) -> Result<Option<DailyRound>, S::Error> {
  store.get_round_by_date(date).await
}

/// Guarantee a round exists for every date in `[today, today + horizon)`.
///
/// Missing dates get a country picked uniformly at random; dates that already
/// have a round are never touched. Returns the rounds created by this call.
/// An empty catalog is a fatal configuration error.
pub async fn ensure_rounds<S, R>(
  store: &S,
  today: NaiveDate,
  horizon_days: u32,
  rng: &mut R,
) -> Result<Vec<DailyRound>, S::Error>
where
  S: GameStore,
  R: Rng + Send,
{
  let countries = store.list_countries().await?;
  if countries.is_empty() {
    return Err(Error::NoCountriesSeeded.into());
  }

  let mut created = Vec::new();
  for date in today.iter_days().take(horizon_days as usize) {
    if store.get_round_by_date(date).await?.is_some() {
      continue;
    }
    let Some(country) = countries.choose(rng) else {
      return Err(Error::NoCountriesSeeded.into());
    };
    let (round, is_new) = store.create_round(date, country.country_id).await?;
    if is_new {
      debug!(%date, country = %country.name, "scheduled round");
      created.push(round);
    }
  }

  info!(created = created.len(), horizon_days, "round schedule ensured");
  Ok(created)
}

/// Outcome of one nightly streak check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakReport {
  pub checked:       usize,
  pub reset:         usize,
  pub failed:        usize,
  /// Yesterday had no round, so nothing could be checked.
  pub missing_round: bool,
}

/// Reset the streak of every verified user who did not win yesterday's round.
///
/// A user who lost yesterday is reset as well as one who never finished, since
/// a streak counts consecutive days *won*. A user who missed yesterday but has
/// already won today keeps a streak of one: that win was counted when it
/// happened. This makes the check safe to rerun on the same day, for example
/// at startup.
///
/// The job never increments; wins extend streaks when they happen. A missing
/// round for yesterday is logged and ends the job without changes. A failure
/// for one user is logged and the job moves on to the next.
pub async fn nightly_streak_check<S: GameStore>(
  store: &S,
  today: NaiveDate,
) -> Result<StreakReport, S::Error> {
  let mut report = StreakReport::default();

  let Some(yesterday) = today.pred_opt() else {
    return Ok(report);
  };
  let Some(round) = store.get_round_by_date(yesterday).await? else {
    error!(date = %yesterday, "no round found for yesterday; skipping streak check");
    report.missing_round = true;
    return Ok(report);
  };
  let today_round = store.get_round_by_date(today).await?;

  for user in store.list_verified_users().await? {
    report.checked += 1;
    let kept = match won_round(store, user.user_id, Some(&round)).await {
      Ok(true) => continue,
      Ok(false) => won_round(store, user.user_id, today_round.as_ref()).await,
      Err(e) => Err(e),
    };
    let streak = match kept {
      Ok(won_today) => u32::from(won_today),
      Err(e) => {
        error!(user = %user.username, error = %e, "streak check failed");
        report.failed += 1;
        continue;
      }
    };
    match store.set_streak(user.user_id, streak).await {
      Ok(()) => report.reset += 1,
      Err(e) => {
        error!(user = %user.username, error = %e, "streak reset failed");
        report.failed += 1;
      }
    }
  }

  info!(
    checked = report.checked,
    reset = report.reset,
    failed = report.failed,
    "nightly streak check finished"
  );
  Ok(report)
}

async fn won_round<S: GameStore>(
  store: &S,
  user_id: Uuid,
  round: Option<&DailyRound>,
) -> Result<bool, S::Error> {
  let Some(round) = round else {
    return Ok(false);
  };
  let session = store.get_session(user_id, round.round_id).await?;
  Ok(session.is_some_and(|s| s.is_game_over && s.won))
}
