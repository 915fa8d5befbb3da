//! Daily rounds: the country-of-the-day assignment.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Assigns one country to one calendar date. Never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRound {
  pub round_id:   Uuid,
  pub date:       NaiveDate,
  pub country_id: i64,
  pub created_at: DateTime<Utc>,
}

/// A finished round as shown in the public round history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastRound {
  pub date:         NaiveDate,
  pub country_id:   i64,
  pub country_name: String,
}

/// How often a country has been the country of the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryTally {
  pub country_id: i64,
  pub name:       String,
  pub count:      u32,
  pub last:       NaiveDate,
}
