//! HTTP Basic authentication against a configured principal list.
//!
//! Credential storage and token issuance live outside this service; a
//! principal here is just an entry in the server configuration mapping a
//! username to a user id, an argon2 password hash, and a privilege flag.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use raksha_core::store::{EmergencyRegistry, LocationTrail};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// One configured account.
#[derive(Debug, Clone, Deserialize)]
pub struct Principal {
  pub user_id:       Uuid,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  /// Staff capability: resolve and view any user's emergency.
  #[serde(default)]
  pub privileged:    bool,
}

/// The accounts accepted as valid for this server instance.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
  pub principals: Vec<Principal>,
}

/// The authenticated caller, resolved from the `Authorization` header.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
  pub user_id:    Uuid,
  pub privileged: bool,
}

/// Verify credentials directly from headers.
pub fn verify_auth(
  headers: &HeaderMap,
  config: &AuthConfig,
) -> Result<Requester, ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthenticated)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthenticated)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthenticated)?;
  let creds =
    std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthenticated)?;

  let (username, password) =
    creds.split_once(':').ok_or(ApiError::Unauthenticated)?;

  let principal = config
    .principals
    .iter()
    .find(|p| p.username == username)
    .ok_or(ApiError::Unauthenticated)?;

  let parsed_hash = PasswordHash::new(&principal.password_hash)
    .map_err(|_| ApiError::Unauthenticated)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthenticated)?;

  Ok(Requester {
    user_id:    principal.user_id,
    privileged: principal.privileged,
  })
}

impl<S> FromRequestParts<AppState<S>> for Requester
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::http::header;
  use rand_core::OsRng;

  fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  fn config() -> (AuthConfig, Uuid) {
    let user_id = Uuid::new_v4();
    let config = AuthConfig {
      principals: vec![
        Principal {
          user_id,
          username: "asha".to_string(),
          password_hash: hash("secret"),
          privileged: false,
        },
        Principal {
          user_id: Uuid::new_v4(),
          username: "staff".to_string(),
          password_hash: hash("override"),
          privileged: true,
        },
      ],
    };
    (config, user_id)
  }

  fn headers(value: Option<&str>) -> HeaderMap {
    let mut map = HeaderMap::new();
    if let Some(v) = value {
      map.insert(header::AUTHORIZATION, v.parse().unwrap());
    }
    map
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn correct_credentials_resolve_the_principal() {
    let (config, user_id) = config();
    let requester =
      verify_auth(&headers(Some(&basic("asha", "secret"))), &config).unwrap();
    assert_eq!(requester.user_id, user_id);
    assert!(!requester.privileged);
  }

  #[test]
  fn privileged_flag_follows_the_principal() {
    let (config, _) = config();
    let requester =
      verify_auth(&headers(Some(&basic("staff", "override"))), &config)
        .unwrap();
    assert!(requester.privileged);
  }

  #[test]
  fn wrong_password_is_rejected() {
    let (config, _) = config();
    let err =
      verify_auth(&headers(Some(&basic("asha", "wrong"))), &config)
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated));
  }

  #[test]
  fn unknown_username_is_rejected() {
    let (config, _) = config();
    let err = verify_auth(&headers(Some(&basic("nobody", "secret"))), &config)
      .unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated));
  }

  #[test]
  fn missing_header_is_rejected() {
    let (config, _) = config();
    assert!(matches!(
      verify_auth(&headers(None), &config).unwrap_err(),
      ApiError::Unauthenticated
    ));
  }

  #[test]
  fn invalid_base64_is_rejected() {
    let (config, _) = config();
    let err = verify_auth(&headers(Some("Basic !!!not-base64!!!")), &config)
      .unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated));
  }
}
