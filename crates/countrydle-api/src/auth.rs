//! HTTP Basic-auth extractor backed by the user table.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use countrydle_core::{
  oracle::{LanguageModel, VectorIndex},
  store::GameStore,
  user::User,
};
use rand_core::OsRng;

use crate::{error::ApiError, game::Game};

/// The authenticated player making the request.
pub struct Player(pub User);

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Split a `Basic` authorization header into username and password.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<(), ApiError> {
  let parsed_hash = PasswordHash::new(password_hash).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)
}

impl<S, M, V> FromRequestParts<Arc<Game<S, M, V>>> for Player
where
  S: GameStore + 'static,
  M: LanguageModel + 'static,
  V: VectorIndex + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    game: &Arc<Game<S, M, V>>,
  ) -> Result<Self, Self::Rejection> {
    let (username, password) = basic_credentials(&parts.headers)?;
    let user = game
      .store()
      .get_user_by_name(&username)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;
    verify_password(&password, &user.password_hash)?;
    Ok(Player(user))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    map
  }

  #[test]
  fn decodes_basic_credentials() {
    let value = format!("Basic {}", B64.encode("alice:s3cret:with:colons"));
    let (user, pass) = basic_credentials(&headers(&value)).unwrap();
    assert_eq!(user, "alice");
    assert_eq!(pass, "s3cret:with:colons");
  }

  #[test]
  fn rejects_other_schemes_and_garbage() {
    assert!(basic_credentials(&HeaderMap::new()).is_err());
    assert!(basic_credentials(&headers("Bearer abc")).is_err());
    assert!(basic_credentials(&headers("Basic !!!not-base64!!!")).is_err());
    let no_colon = format!("Basic {}", B64.encode("alice"));
    assert!(basic_credentials(&headers(&no_colon)).is_err());
  }

  #[test]
  fn hashed_password_verifies() {
    let hash = hash_password("secret").unwrap();
    assert!(verify_password("secret", &hash).is_ok());
    assert!(matches!(verify_password("wrong", &hash), Err(ApiError::Unauthorized)));
    assert!(verify_password("secret", "not-a-phc-string").is_err());
  }
}
