//! Bounded retry for startup steps that depend on other services.

use std::{fmt::Display, time::Duration};

use tracing::{error, warn};

use crate::config::RetryConfig;

/// Run `op` up to `policy.attempts` times, sleeping `policy.delay_secs`
/// between failures. The last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(what: &str, policy: RetryConfig, mut op: F) -> Result<T, E>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: Display,
{
  let attempts = policy.attempts.max(1);
  let mut attempt = 1;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(e) if attempt < attempts => {
        warn!(what, attempt, attempts, error = %e, "startup step failed, retrying");
        tokio::time::sleep(Duration::from_secs(policy.delay_secs)).await;
        attempt += 1;
      }
      Err(e) => {
        error!(what, attempts, error = %e, "startup step failed, giving up");
        return Err(e);
      }
    }
  }
}
