//! Emergency — a time-bounded incident tracked from trigger to resolution.
//!
//! An emergency is created in `Active` status and mutated exactly once, by
//! the resolve transition. Resolved records are retained forever as history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of an emergency. `Resolved` is terminal.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SosStatus {
  Active,
  Resolved,
}

/// One SOS incident.
///
/// Invariants, enforced by the registry backend:
/// - a user has at most one `Active` emergency at any time;
/// - `ended_at` is set if and only if `status` is `Resolved`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emergency {
  /// Externally supplied opaque identifier, unique across all emergencies.
  pub alert_id:    String,
  pub user_id:     Uuid,
  pub status:      SosStatus,
  pub started_at:  DateTime<Utc>,
  pub ended_at:    Option<DateTime<Utc>>,
  /// The staff member who resolved the emergency; `None` on self-resolve.
  pub resolved_by: Option<Uuid>,
  pub notes:       Option<String>,
}

impl Emergency {
  pub fn is_active(&self) -> bool { self.status == SosStatus::Active }

  /// Wall-clock seconds from start to end, or to now while still active.
  pub fn duration_seconds(&self) -> i64 {
    let end = self.ended_at.unwrap_or_else(Utc::now);
    (end - self.started_at).num_seconds()
  }
}

/// Aggregate counters over every emergency ever recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SosStats {
  pub total:    u64,
  pub active:   u64,
  pub resolved: u64,
}
