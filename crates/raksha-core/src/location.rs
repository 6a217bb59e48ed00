//! Location samples — immutable, append-only position reports.
//!
//! A sample is created once per report and never mutated. Samples tagged
//! [`LocationUpdateType::Sos`] belong to an emergency's trail and always
//! carry that emergency's alert id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Why a sample was captured.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LocationUpdateType {
  /// Part of an active emergency's trail.
  Sos,
  /// A one-off report the user sent deliberately.
  #[default]
  Manual,
  /// Captured by a background timer on the device.
  Periodic,
}

/// One reported geographic position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSample {
  pub sample_id:   Uuid,
  pub user_id:     Uuid,
  /// The emergency this sample belongs to; always set for `Sos` samples.
  pub alert_id:    Option<String>,
  pub latitude:    f64,
  pub longitude:   f64,
  /// Device-reported accuracy radius in metres, when available.
  pub accuracy:    Option<f64>,
  pub captured_at: DateTime<Utc>,
  pub update_type: LocationUpdateType,
}

/// The caller-supplied portion of a position report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationFix {
  pub latitude:    f64,
  pub longitude:   f64,
  pub accuracy:    Option<f64>,
  /// Device capture time. The store stamps the insert time when absent.
  pub captured_at: Option<DateTime<Utc>>,
}

/// Insert shape for [`LocationSample`]. The store assigns `sample_id`.
#[derive(Debug, Clone)]
pub struct NewLocation {
  pub user_id:     Uuid,
  pub alert_id:    Option<String>,
  pub latitude:    f64,
  pub longitude:   f64,
  pub accuracy:    Option<f64>,
  pub captured_at: Option<DateTime<Utc>>,
  pub update_type: LocationUpdateType,
}

impl NewLocation {
  /// A sample belonging to an emergency's trail, owned by the emergency's
  /// user.
  pub fn for_emergency(
    user_id: Uuid,
    alert_id: impl Into<String>,
    fix: LocationFix,
  ) -> Self {
    Self {
      user_id,
      alert_id: Some(alert_id.into()),
      latitude: fix.latitude,
      longitude: fix.longitude,
      accuracy: fix.accuracy,
      captured_at: fix.captured_at,
      update_type: LocationUpdateType::Sos,
    }
  }

  /// A standalone self-report with no emergency attached.
  pub fn standalone(
    user_id: Uuid,
    fix: LocationFix,
    update_type: LocationUpdateType,
  ) -> Self {
    Self {
      user_id,
      alert_id: None,
      latitude: fix.latitude,
      longitude: fix.longitude,
      accuracy: fix.accuracy,
      captured_at: fix.captured_at,
      update_type,
    }
  }
}

/// The latest known position of a user with an active emergency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveLocation {
  pub alert_id: String,
  pub user_id:  Uuid,
  pub sample:   LocationSample,
}
