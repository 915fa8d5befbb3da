//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use countrydle_core::{Error as RuleError, store::StoreError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The end state was requested while the game is still running.
  #[error("the game for this round is not over yet")]
  GameInProgress,

  #[error(transparent)]
  Rule(RuleError),

  #[error(transparent)]
  Oracle(countrydle_oracle::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a store error, surfacing rule violations raised inside the store's
  /// atomic writes as such.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.as_rule() {
      Some(rule) => Self::Rule(rule.clone()),
      None => Self::Store(Box::new(e)),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::GameInProgress => StatusCode::CONFLICT,
      Self::Rule(rule) => rule_status(rule),
      Self::Oracle(countrydle_oracle::Error::Rule(rule)) => rule_status(rule),
      Self::Oracle(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
      Self::Oracle(countrydle_oracle::Error::Store(_)) | Self::Store(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
      Self::Oracle(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

fn rule_status(rule: &RuleError) -> StatusCode {
  match rule {
    RuleError::QuotaExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
    RuleError::GameAlreadyOver => StatusCode::CONFLICT,
    RuleError::NoRoundForDate(_) | RuleError::NoCountriesSeeded => {
      StatusCode::SERVICE_UNAVAILABLE
    }
    RuleError::SessionNotFound(_) => StatusCode::NOT_FOUND,
    RuleError::MalformedOracleOutput(_) | RuleError::UnknownVerdict(_) => {
      StatusCode::BAD_GATEWAY
    }
  }
}

impl From<countrydle_oracle::Error> for ApiError {
  fn from(e: countrydle_oracle::Error) -> Self {
    match e {
      countrydle_oracle::Error::Rule(rule) => Self::Rule(rule),
      other => Self::Oracle(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if matches!(self, Self::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"countrydle\""),
      );
    }
    res
  }
}
