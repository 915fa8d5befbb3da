//! The guess oracle: does a free-text guess name the country of the day?

use countrydle_core::{country::Country, oracle::LanguageModel, record::GuessVerdict};
use serde_json::Value;
use tracing::debug;

use crate::{Result, error::malformed, prompts};

/// Judge `guess` against `country`. Casual names and abbreviations count as
/// correct; a guess naming several countries is [`GuessVerdict::Ambiguous`].
pub async fn judge<M: LanguageModel>(
  model: &M,
  guess: &str,
  country: &Country,
) -> Result<GuessVerdict> {
  let guess = guess.trim();
  if guess.is_empty() {
    return Ok(GuessVerdict::Ambiguous);
  }

  let user = format!(
    "Country: {} ({}). Guess: {guess}",
    country.name, country.official_name
  );
  let reply = model.complete_json(prompts::GUESS, &user).await?;
  let verdict = match reply.get("answer") {
    Some(Value::Bool(b)) => GuessVerdict::from(Some(*b)),
    Some(Value::Null) => GuessVerdict::Ambiguous,
    _ => return Err(malformed(format!("guess verdict must be true, false or null: {reply}"))),
  };
  debug!(%verdict, "guess judged");
  Ok(verdict)
}
