//! The store traits implemented by storage backends.
//!
//! [`EmergencyRegistry`] is the single source of truth for emergency records
//! and the one-active-per-user invariant; [`LocationTrail`] is a durable,
//! time-ordered append log of position samples. Higher layers depend on
//! these abstractions, not on any concrete backend. Neither trait publishes
//! events — event emission belongs to the coordinator, ordered with the
//! mutation that caused it.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  Result,
  emergency::{Emergency, SosStats, SosStatus},
  location::{LiveLocation, LocationSample, NewLocation},
};

// ─── Registry outcome ────────────────────────────────────────────────────────

/// Outcome of [`EmergencyRegistry::create_active`].
///
/// "Already active" is not an error: the conflicting record is returned so
/// the caller can surface it instead of silently dropping it. Callers branch
/// on the tag, never on a boolean.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
  /// A new emergency was inserted and committed.
  Created(Emergency),
  /// The user already had an active emergency; nothing was inserted.
  AlreadyActive(Emergency),
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Owner of emergency records and their status transitions.
pub trait EmergencyRegistry: Send + Sync {
  /// Check-and-insert as one atomic unit against concurrent triggers for the
  /// same user (double-taps, duplicate network retries). Committed durably
  /// before returning. Fails with [`crate::Error::DuplicateAlert`] when the
  /// alert id is taken.
  fn create_active<'a>(
    &'a self,
    user_id: Uuid,
    alert_id: &'a str,
  ) -> impl Future<Output = Result<CreateOutcome>> + Send + 'a;

  /// Transition an emergency to `Resolved`, setting `ended_at` and, when
  /// supplied, the resolver identity and notes. Fails with
  /// [`crate::Error::NotFound`] or [`crate::Error::AlreadyResolved`].
  fn resolve<'a>(
    &'a self,
    alert_id: &'a str,
    resolved_by: Option<Uuid>,
    notes: Option<String>,
  ) -> impl Future<Output = Result<Emergency>> + Send + 'a;

  fn get_by_alert_id<'a>(
    &'a self,
    alert_id: &'a str,
  ) -> impl Future<Output = Result<Option<Emergency>>> + Send + 'a;

  /// All active emergencies, most recently started first.
  fn list_active(
    &self,
  ) -> impl Future<Output = Result<Vec<Emergency>>> + Send + '_;

  /// One user's emergencies, most recently started first.
  fn list_for_user(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Emergency>>> + Send + '_;

  /// Every user's emergencies, optionally filtered by status, most recently
  /// started first.
  fn list_all(
    &self,
    status: Option<SosStatus>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Emergency>>> + Send + '_;

  fn stats(&self) -> impl Future<Output = Result<SosStats>> + Send + '_;
}

// ─── Trail ───────────────────────────────────────────────────────────────────

/// Durable, time-ordered append log of location samples.
pub trait LocationTrail: Send + Sync {
  /// Pure insert; never rejects on business rules (whether an emergency is
  /// active is the coordinator's concern). On [`crate::Error::Storage`] the
  /// caller must not assume the sample was recorded.
  fn append(
    &self,
    input: NewLocation,
  ) -> impl Future<Output = Result<LocationSample>> + Send + '_;

  /// The user's most recent sample across all update types.
  fn latest_for(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<LocationSample>>> + Send + '_;

  /// One emergency's samples ordered by capture time (ties broken by
  /// insertion order): ascending for full-history reads, descending for
  /// latest-first reads.
  fn trail_for<'a>(
    &'a self,
    alert_id: &'a str,
    ascending: bool,
  ) -> impl Future<Output = Result<Vec<LocationSample>>> + Send + 'a;

  /// One user's samples, most recent first.
  fn recent_for_user(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LocationSample>>> + Send + '_;

  /// The latest sample for every user with an active emergency.
  fn latest_for_active(
    &self,
  ) -> impl Future<Output = Result<Vec<LiveLocation>>> + Send + '_;
}
