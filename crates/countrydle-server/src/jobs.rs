//! The daily maintenance jobs: keep rounds scheduled ahead and reset broken
//! streaks.

use std::{sync::Arc, time::Duration};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use countrydle_core::{
  schedule::{StreakReport, ensure_rounds, nightly_streak_check},
  store::GameStore,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReport {
  pub rounds_created: usize,
  pub streaks:        StreakReport,
}

/// Schedule rounds for `[today, today + horizon)`, then run the streak check
/// for yesterday.
pub async fn run_daily<S, R>(
  store: &S,
  today: NaiveDate,
  horizon_days: u32,
  rng: &mut R,
) -> Result<DailyReport, S::Error>
where
  S: GameStore,
  R: Rng + Send,
{
  let created = ensure_rounds(store, today, horizon_days, rng).await?;
  let streaks = nightly_streak_check(store, today).await?;
  let report = DailyReport { rounds_created: created.len(), streaks };
  info!(
    %today,
    rounds_created = report.rounds_created,
    streaks_checked = streaks.checked,
    streaks_reset = streaks.reset,
    "daily jobs done"
  );
  Ok(report)
}

/// Time left from `now` until the next occurrence of `at`.
pub fn until_next(now: NaiveDateTime, at: NaiveTime) -> Duration {
  let today_at = now.date().and_time(at);
  let next = if today_at > now { today_at } else { today_at + TimeDelta::days(1) };
  (next - now).to_std().unwrap_or_default()
}

/// Run the daily jobs at `at` (UTC) every day, forever.
pub async fn daily_loop<S>(store: Arc<S>, at: NaiveTime, horizon_days: u32)
where
  S: GameStore + 'static,
{
  let mut rng = StdRng::from_entropy();
  loop {
    let wait = until_next(Utc::now().naive_utc(), at);
    debug!(secs = wait.as_secs(), "sleeping until the daily jobs");
    tokio::time::sleep(wait).await;

    let today = Utc::now().date_naive();
    if let Err(e) = run_daily(store.as_ref(), today, horizon_days, &mut rng).await {
      error!(%today, error = %e, "daily jobs failed");
    }
  }
}
