//! The question classifier.
//!
//! Decides whether raw player text is a well-formed True/False question about
//! an unspecified country and, if so, restates it canonically. The country of
//! the day is never part of this call, so the verdict cannot leak it.

use countrydle_core::oracle::LanguageModel;
use serde_json::Value;
use tracing::debug;

use crate::{Result, error::malformed, prompts};

/// The classifier's verdict on one piece of player text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enhanced {
  Valid { question: String },
  Invalid { explanation: String },
}

impl Enhanced {
  pub fn is_valid(&self) -> bool { matches!(self, Self::Valid { .. }) }
}

pub async fn enhance<M: LanguageModel>(model: &M, raw: &str) -> Result<Enhanced> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Ok(Enhanced::Invalid { explanation: "The question is empty.".into() });
  }

  let reply = model.complete_json(prompts::CLASSIFY, raw).await?;
  let enhanced = parse(&reply)?;
  debug!(valid = enhanced.is_valid(), "question classified");
  Ok(enhanced)
}

fn parse(reply: &Value) -> Result<Enhanced> {
  let valid = reply
    .get("valid")
    .and_then(Value::as_bool)
    .ok_or_else(|| malformed(format!("classifier reply lacks a boolean `valid`: {reply}")))?;

  if valid {
    let question = reply
      .get("question")
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|q| !q.is_empty())
      .ok_or_else(|| malformed(format!("valid question without restatement: {reply}")))?;
    return Ok(Enhanced::Valid { question: question.to_owned() });
  }

  let explanation = match reply.get("explanation") {
    Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
    Some(Value::String(_)) | Some(Value::Null) | None => {
      "This is not a True/False question about a country.".to_owned()
    }
    Some(other) => return Err(malformed(format!("explanation is not text: {other}"))),
  };
  Ok(Enhanced::Invalid { explanation })
}
