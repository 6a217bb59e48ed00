//! The error taxonomy shared by every public operation.
//!
//! Failures are values: no internal storage or transport error type crosses
//! a trait boundary. Backends translate their own failures into
//! [`Error::Storage`] before returning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// No emergency exists with the given alert id.
  #[error("emergency not found: {0}")]
  NotFound(String),

  /// The emergency already reached its terminal state. Re-resolving is a
  /// no-op error, never a second resolution.
  #[error("emergency {0} is already resolved")]
  AlreadyResolved(String),

  /// A location update arrived for an emergency that is no longer active.
  #[error("emergency {0} is not active")]
  NotActive(String),

  /// The requester neither owns the emergency nor holds the privileged
  /// capability.
  #[error("unauthorized")]
  Unauthorized,

  /// The externally supplied alert id is already taken by another emergency.
  #[error("alert id already exists: {0}")]
  DuplicateAlert(String),

  /// A required field is missing or malformed.
  #[error("validation failure: {0}")]
  Validation(String),

  /// The durable store failed; the caller must not assume the write was
  /// recorded.
  #[error("storage failure: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
