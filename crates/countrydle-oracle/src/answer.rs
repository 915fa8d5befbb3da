//! The answer oracle: true, false or unknown for a canonical question.

use countrydle_core::{country::Country, oracle::LanguageModel, record::Answer};
use serde_json::Value;
use tracing::debug;

use crate::{Result, error::malformed, prompts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
  pub answer:      Answer,
  pub explanation: String,
}

/// Answer `question` about `country` from the retrieved `facts` and general
/// knowledge. Output that is not exactly `true`, `false` or `null` is a hard
/// failure; no verdict is ever assumed.
pub async fn answer<M: LanguageModel>(
  model: &M,
  question: &str,
  country: &Country,
  facts: &str,
) -> Result<Verdict> {
  let system = prompts::answer(&country.name, facts);
  let reply = model
    .complete_json(&system, &format!("Question: {question}"))
    .await?;
  let verdict = parse(&reply)?;
  debug!(answer = %verdict.answer, "question answered");
  Ok(verdict)
}

fn parse(reply: &Value) -> Result<Verdict> {
  let answer = match reply.get("answer") {
    Some(Value::Bool(b)) => Answer::from(Some(*b)),
    Some(Value::Null) => Answer::Unknown,
    other => {
      return Err(malformed(format!(
        "answer must be true, false or null, got {}",
        other.map_or_else(|| "nothing".to_owned(), Value::to_string)
      )));
    }
  };
  let explanation = reply
    .get("explanation")
    .and_then(Value::as_str)
    .ok_or_else(|| malformed(format!("answer without explanation: {reply}")))?
    .trim()
    .to_owned();
  Ok(Verdict { answer, explanation })
}
