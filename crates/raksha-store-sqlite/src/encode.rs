//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Status and update-type
//! discriminants are stored as their lowercase string forms. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use raksha_core::{
  Error, Result,
  emergency::{Emergency, SosStatus},
  location::{LocationSample, LocationUpdateType},
};
use uuid::Uuid;

// ─── Scalar codecs ───────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| Error::Storage(format!("corrupt uuid: {e}")))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Storage(format!("corrupt timestamp: {e}")))
}

pub fn decode_status(s: &str) -> Result<SosStatus> {
  s.parse()
    .map_err(|_| Error::Storage(format!("unknown status: {s:?}")))
}

pub fn decode_update_type(s: &str) -> Result<LocationUpdateType> {
  s.parse()
    .map_err(|_| Error::Storage(format!("unknown update type: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `emergencies` row.
pub struct RawEmergency {
  pub alert_id:    String,
  pub user_id:     String,
  pub status:      String,
  pub started_at:  String,
  pub ended_at:    Option<String>,
  pub resolved_by: Option<String>,
  pub notes:       Option<String>,
}

/// Row mapper for the canonical emergencies column order:
/// `alert_id, user_id, status, started_at, ended_at, resolved_by, notes`.
pub fn raw_emergency_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawEmergency> {
  Ok(RawEmergency {
    alert_id:    row.get(0)?,
    user_id:     row.get(1)?,
    status:      row.get(2)?,
    started_at:  row.get(3)?,
    ended_at:    row.get(4)?,
    resolved_by: row.get(5)?,
    notes:       row.get(6)?,
  })
}

impl RawEmergency {
  pub fn into_emergency(self) -> Result<Emergency> {
    Ok(Emergency {
      alert_id:    self.alert_id,
      user_id:     decode_uuid(&self.user_id)?,
      status:      decode_status(&self.status)?,
      started_at:  decode_dt(&self.started_at)?,
      ended_at:    self.ended_at.as_deref().map(decode_dt).transpose()?,
      resolved_by: self.resolved_by.as_deref().map(decode_uuid).transpose()?,
      notes:       self.notes,
    })
  }
}

/// Raw strings read directly from a `locations` row.
pub struct RawSample {
  pub sample_id:   String,
  pub user_id:     String,
  pub alert_id:    Option<String>,
  pub latitude:    f64,
  pub longitude:   f64,
  pub accuracy:    Option<f64>,
  pub captured_at: String,
  pub update_type: String,
}

/// Row mapper for the canonical locations column order:
/// `sample_id, user_id, alert_id, latitude, longitude, accuracy,
/// captured_at, update_type`.
pub fn raw_sample_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawSample> {
  Ok(RawSample {
    sample_id:   row.get(0)?,
    user_id:     row.get(1)?,
    alert_id:    row.get(2)?,
    latitude:    row.get(3)?,
    longitude:   row.get(4)?,
    accuracy:    row.get(5)?,
    captured_at: row.get(6)?,
    update_type: row.get(7)?,
  })
}

impl RawSample {
  pub fn into_sample(self) -> Result<LocationSample> {
    Ok(LocationSample {
      sample_id:   decode_uuid(&self.sample_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      alert_id:    self.alert_id,
      latitude:    self.latitude,
      longitude:   self.longitude,
      accuracy:    self.accuracy,
      captured_at: decode_dt(&self.captured_at)?,
      update_type: decode_update_type(&self.update_type)?,
    })
  }
}
