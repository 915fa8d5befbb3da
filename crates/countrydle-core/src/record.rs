//! Question and guess records: the append-only history of a session.
//!
//! Every submission is stored, including rejected questions, so a player's
//! history can be replayed exactly. Records are never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

// ─── Verdicts ────────────────────────────────────────────────────────────────

/// The answer oracle's verdict on a canonical yes/no question.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Answer {
  True,
  False,
  /// The oracle could not answer with confidence.
  Unknown,
}

impl From<Option<bool>> for Answer {
  fn from(value: Option<bool>) -> Self {
    match value {
      Some(true) => Self::True,
      Some(false) => Self::False,
      None => Self::Unknown,
    }
  }
}

/// The guess oracle's verdict on a free-text guess.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GuessVerdict {
  Correct,
  Incorrect,
  /// The guess named several countries or could not be interpreted.
  Ambiguous,
}

impl GuessVerdict {
  pub fn is_correct(self) -> bool { matches!(self, Self::Correct) }
}

impl From<Option<bool>> for GuessVerdict {
  fn from(value: Option<bool>) -> Self {
    match value {
      Some(true) => Self::Correct,
      Some(false) => Self::Incorrect,
      None => Self::Ambiguous,
    }
  }
}

// ─── Questions ───────────────────────────────────────────────────────────────

/// What became of a submitted question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionOutcome {
  /// Accepted by the classifier and answered; consumes one question.
  Valid {
    /// The canonical restatement the oracle answered.
    question:    String,
    answer:      Answer,
    explanation: String,
  },
  /// Rejected by the classifier; stored for history, costs nothing.
  Invalid { explanation: String },
}

impl QuestionOutcome {
  pub fn is_valid(&self) -> bool { matches!(self, Self::Valid { .. }) }

  pub fn answer(&self) -> Option<Answer> {
    match self {
      Self::Valid { answer, .. } => Some(*answer),
      Self::Invalid { .. } => None,
    }
  }

  pub fn explanation(&self) -> &str {
    match self {
      Self::Valid { explanation, .. } | Self::Invalid { explanation } => {
        explanation
      }
    }
  }
}

/// One stored question attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
  pub question_id: Uuid,
  pub user_id:     Uuid,
  pub round_id:    Uuid,
  /// The raw text as the player typed it.
  pub original:    String,
  pub outcome:     QuestionOutcome,
  /// The retrieved fact fragments the oracle was shown, if any.
  pub context:     Option<String>,
  pub asked_at:    DateTime<Utc>,
}

/// Input to [`crate::store::GameStore::record_question`].
#[derive(Debug, Clone)]
pub struct NewQuestion {
  pub original: String,
  pub outcome:  QuestionOutcome,
  pub context:  Option<String>,
}

// ─── Guesses ─────────────────────────────────────────────────────────────────

/// One stored guess attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessRecord {
  pub guess_id:   Uuid,
  pub user_id:    Uuid,
  pub round_id:   Uuid,
  pub guess:      String,
  pub verdict:    GuessVerdict,
  pub guessed_at: DateTime<Utc>,
}

/// Input to [`crate::store::GameStore::record_guess`].
#[derive(Debug, Clone)]
pub struct NewGuess {
  pub guess:   String,
  pub verdict: GuessVerdict,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verdicts_round_trip_through_strings() {
    assert_eq!(Answer::Unknown.to_string(), "unknown");
    assert_eq!("false".parse::<Answer>().unwrap(), Answer::False);
    assert_eq!(GuessVerdict::Ambiguous.to_string(), "ambiguous");
    assert!("maybe".parse::<GuessVerdict>().is_err());
  }

  #[test]
  fn null_maps_to_unknown_and_ambiguous() {
    assert_eq!(Answer::from(None), Answer::Unknown);
    assert_eq!(GuessVerdict::from(Some(true)), GuessVerdict::Correct);
    assert_eq!(GuessVerdict::from(None), GuessVerdict::Ambiguous);
  }

  #[test]
  fn outcome_serialises_with_kind_tag() {
    let invalid = QuestionOutcome::Invalid {
      explanation: "not a yes/no question".into(),
    };
    let json = serde_json::to_value(&invalid).unwrap();
    assert_eq!(json["kind"], "invalid");
    assert!(!invalid.is_valid());
    assert_eq!(invalid.answer(), None);
  }
}
