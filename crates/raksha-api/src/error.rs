//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! The response body keeps the `{"success": false, "message": ...}` envelope
//! the mobile clients already consume.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or invalid credentials.
  #[error("unauthenticated")]
  Unauthenticated,

  /// Authenticated, but not allowed to act on this resource.
  #[error("forbidden")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  /// State conflict: already-active trigger, duplicate alert id, or a
  /// repeated resolve.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<raksha_core::Error> for ApiError {
  fn from(e: raksha_core::Error) -> Self {
    use raksha_core::Error as E;
    match e {
      E::NotFound(_) => ApiError::NotFound(e.to_string()),
      E::Unauthorized => ApiError::Forbidden,
      E::AlreadyResolved(_) | E::DuplicateAlert(_) => {
        ApiError::Conflict(e.to_string())
      }
      E::NotActive(_) | E::Validation(_) => ApiError::BadRequest(e.to_string()),
      E::Storage(_) => ApiError::Internal(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthenticated => {
        (StatusCode::UNAUTHORIZED, "unauthenticated".to_string())
      }
      ApiError::Forbidden => (StatusCode::FORBIDDEN, "unauthorized".to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };

    let mut res =
      (status, Json(json!({ "success": false, "message": message })))
        .into_response();
    if matches!(self, ApiError::Unauthenticated) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"raksha\""),
      );
    }
    res
  }
}
