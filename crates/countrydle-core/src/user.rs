//! Players. Registration and e-mail verification live outside this system;
//! users are created by the `add-user` admin command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  #[serde(skip)]
  pub password_hash: String,
  /// Only verified users take part in the nightly streak check.
  pub verified:      bool,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::GameStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub password_hash: String,
  pub verified:      bool,
}
