//! [`SqliteStore`] — the SQLite implementation of the registry and trail
//! traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use raksha_core::{
  Error, Result,
  emergency::{Emergency, SosStats, SosStatus},
  location::{LiveLocation, LocationSample, NewLocation},
  store::{CreateOutcome, EmergencyRegistry, LocationTrail},
};

use crate::{
  encode::{
    encode_dt, encode_uuid, raw_emergency_from_row, raw_sample_from_row,
    RawEmergency, RawSample,
  },
  schema::SCHEMA,
};

/// Translate a database-layer failure into the public taxonomy.
fn storage(e: tokio_rusqlite::Error) -> Error { Error::Storage(e.to_string()) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Raksha store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// run whole on the connection's dedicated thread, so each store operation
/// is atomic with respect to every other.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(storage)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(storage)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(storage)
  }
}

// ─── Registry impl ───────────────────────────────────────────────────────────

/// Closure-side outcome of the create_active transaction.
enum RawCreate {
  Created,
  AlreadyActive(RawEmergency),
  DuplicateAlert,
}

/// Closure-side outcome of the resolve transaction.
enum RawResolve {
  NotFound,
  AlreadyResolved,
  Resolved(RawEmergency),
}

impl EmergencyRegistry for SqliteStore {
  async fn create_active(
    &self,
    user_id: Uuid,
    alert_id: &str,
  ) -> Result<CreateOutcome> {
    let emergency = Emergency {
      alert_id:    alert_id.to_owned(),
      user_id,
      status:      SosStatus::Active,
      started_at:  Utc::now(),
      ended_at:    None,
      resolved_by: None,
      notes:       None,
    };

    let alert_str   = emergency.alert_id.clone();
    let user_str    = encode_uuid(user_id);
    let started_str = encode_dt(emergency.started_at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<RawEmergency> = tx
          .query_row(
            "SELECT alert_id, user_id, status, started_at, ended_at,
                    resolved_by, notes
             FROM emergencies
             WHERE user_id = ?1 AND status = 'active'",
            rusqlite::params![user_str],
            raw_emergency_from_row,
          )
          .optional()?;

        if let Some(e) = existing {
          return Ok(RawCreate::AlreadyActive(e));
        }

        let inserted = tx.execute(
          "INSERT INTO emergencies (alert_id, user_id, status, started_at)
           VALUES (?1, ?2, 'active', ?3)",
          rusqlite::params![alert_str, user_str, started_str],
        );
        match inserted {
          Ok(_) => {}
          // The active-per-user check ran inside this transaction, so a
          // constraint hit here can only be the alert_id primary key.
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            return Ok(RawCreate::DuplicateAlert);
          }
          Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(RawCreate::Created)
      })
      .await
      .map_err(storage)?;

    match raw {
      RawCreate::Created => Ok(CreateOutcome::Created(emergency)),
      RawCreate::AlreadyActive(e) => {
        Ok(CreateOutcome::AlreadyActive(e.into_emergency()?))
      }
      RawCreate::DuplicateAlert => {
        Err(Error::DuplicateAlert(emergency.alert_id))
      }
    }
  }

  async fn resolve(
    &self,
    alert_id: &str,
    resolved_by: Option<Uuid>,
    notes: Option<String>,
  ) -> Result<Emergency> {
    let alert        = alert_id.to_owned();
    let alert_str    = alert.clone();
    let ended_str    = encode_dt(Utc::now());
    let resolver_str = resolved_by.map(encode_uuid);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let status: Option<String> = tx
          .query_row(
            "SELECT status FROM emergencies WHERE alert_id = ?1",
            rusqlite::params![alert_str],
            |r| r.get(0),
          )
          .optional()?;

        match status.as_deref() {
          None => return Ok(RawResolve::NotFound),
          Some("resolved") => return Ok(RawResolve::AlreadyResolved),
          Some(_) => {}
        }

        // The only UPDATE ever issued against this table.
        tx.execute(
          "UPDATE emergencies
           SET status = 'resolved', ended_at = ?2, resolved_by = ?3,
               notes = COALESCE(?4, notes)
           WHERE alert_id = ?1",
          rusqlite::params![alert_str, ended_str, resolver_str, notes],
        )?;

        let updated = tx.query_row(
          "SELECT alert_id, user_id, status, started_at, ended_at,
                  resolved_by, notes
           FROM emergencies WHERE alert_id = ?1",
          rusqlite::params![alert_str],
          raw_emergency_from_row,
        )?;

        tx.commit()?;
        Ok(RawResolve::Resolved(updated))
      })
      .await
      .map_err(storage)?;

    match raw {
      RawResolve::NotFound => Err(Error::NotFound(alert)),
      RawResolve::AlreadyResolved => Err(Error::AlreadyResolved(alert)),
      RawResolve::Resolved(r) => r.into_emergency(),
    }
  }

  async fn get_by_alert_id(&self, alert_id: &str) -> Result<Option<Emergency>> {
    let alert_str = alert_id.to_owned();

    let raw: Option<RawEmergency> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT alert_id, user_id, status, started_at, ended_at,
                      resolved_by, notes
               FROM emergencies WHERE alert_id = ?1",
              rusqlite::params![alert_str],
              raw_emergency_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(storage)?;

    raw.map(RawEmergency::into_emergency).transpose()
  }

  async fn list_active(&self) -> Result<Vec<Emergency>> {
    let raws: Vec<RawEmergency> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT alert_id, user_id, status, started_at, ended_at,
                  resolved_by, notes
           FROM emergencies
           WHERE status = 'active'
           ORDER BY started_at DESC",
        )?;
        let rows = stmt
          .query_map([], raw_emergency_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawEmergency::into_emergency).collect()
  }

  async fn list_for_user(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> Result<Vec<Emergency>> {
    let user_str  = encode_uuid(user_id);
    let limit_val = limit as i64;

    let raws: Vec<RawEmergency> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT alert_id, user_id, status, started_at, ended_at,
                  resolved_by, notes
           FROM emergencies
           WHERE user_id = ?1
           ORDER BY started_at DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, limit_val], raw_emergency_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawEmergency::into_emergency).collect()
  }

  async fn list_all(
    &self,
    status: Option<SosStatus>,
    limit: usize,
  ) -> Result<Vec<Emergency>> {
    let status_str = status.map(|s| s.to_string());
    let limit_val  = limit as i64;

    let raws: Vec<RawEmergency> = self
      .conn
      .call(move |conn| {
        let where_clause = if status_str.is_some() {
          "WHERE status = ?1"
        } else {
          ""
        };
        let sql = format!(
          "SELECT alert_id, user_id, status, started_at, ended_at,
                  resolved_by, notes
           FROM emergencies
           {where_clause}
           ORDER BY started_at DESC
           LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![status_str.as_deref(), limit_val],
            raw_emergency_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawEmergency::into_emergency).collect()
  }

  async fn stats(&self) -> Result<SosStats> {
    let (total, active, resolved): (i64, i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*),
                  COALESCE(SUM(status = 'active'), 0),
                  COALESCE(SUM(status = 'resolved'), 0)
           FROM emergencies",
          [],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?)
      })
      .await
      .map_err(storage)?;

    Ok(SosStats {
      total:    total as u64,
      active:   active as u64,
      resolved: resolved as u64,
    })
  }
}

// ─── Trail impl ──────────────────────────────────────────────────────────────

impl LocationTrail for SqliteStore {
  async fn append(&self, input: NewLocation) -> Result<LocationSample> {
    let sample = LocationSample {
      sample_id:   Uuid::new_v4(),
      user_id:     input.user_id,
      alert_id:    input.alert_id,
      latitude:    input.latitude,
      longitude:   input.longitude,
      accuracy:    input.accuracy,
      captured_at: input.captured_at.unwrap_or_else(Utc::now),
      update_type: input.update_type,
    };

    let id_str       = encode_uuid(sample.sample_id);
    let user_str     = encode_uuid(sample.user_id);
    let alert_str    = sample.alert_id.clone();
    let captured_str = encode_dt(sample.captured_at);
    let type_str     = sample.update_type.to_string();
    let (lat, lon)   = (sample.latitude, sample.longitude);
    let accuracy     = sample.accuracy;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO locations (
             sample_id, user_id, alert_id, latitude, longitude,
             accuracy, captured_at, update_type
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            user_str,
            alert_str,
            lat,
            lon,
            accuracy,
            captured_str,
            type_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(storage)?;

    Ok(sample)
  }

  async fn latest_for(&self, user_id: Uuid) -> Result<Option<LocationSample>> {
    let user_str = encode_uuid(user_id);

    let raw: Option<RawSample> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT sample_id, user_id, alert_id, latitude, longitude,
                      accuracy, captured_at, update_type
               FROM locations
               WHERE user_id = ?1
               ORDER BY captured_at DESC, rowid DESC
               LIMIT 1",
              rusqlite::params![user_str],
              raw_sample_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(storage)?;

    raw.map(RawSample::into_sample).transpose()
  }

  async fn trail_for(
    &self,
    alert_id: &str,
    ascending: bool,
  ) -> Result<Vec<LocationSample>> {
    let alert_str = alert_id.to_owned();
    // rowid breaks capture-time ties in insertion order.
    let order = if ascending {
      "captured_at ASC, rowid ASC"
    } else {
      "captured_at DESC, rowid DESC"
    };

    let raws: Vec<RawSample> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT sample_id, user_id, alert_id, latitude, longitude,
                  accuracy, captured_at, update_type
           FROM locations
           WHERE alert_id = ?1
           ORDER BY {order}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![alert_str], raw_sample_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawSample::into_sample).collect()
  }

  async fn recent_for_user(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> Result<Vec<LocationSample>> {
    let user_str  = encode_uuid(user_id);
    let limit_val = limit as i64;

    let raws: Vec<RawSample> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT sample_id, user_id, alert_id, latitude, longitude,
                  accuracy, captured_at, update_type
           FROM locations
           WHERE user_id = ?1
           ORDER BY captured_at DESC, rowid DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, limit_val], raw_sample_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawSample::into_sample).collect()
  }

  async fn latest_for_active(&self) -> Result<Vec<LiveLocation>> {
    let rows: Vec<(String, RawSample)> = self
      .conn
      .call(|conn| {
        // One row per active emergency: that user's single most recent
        // sample, regardless of which emergency (if any) owns the sample.
        let mut stmt = conn.prepare(
          "SELECT e.alert_id,
                  l.sample_id, l.user_id, l.alert_id, l.latitude,
                  l.longitude, l.accuracy, l.captured_at, l.update_type
           FROM emergencies e
           JOIN locations l ON l.user_id = e.user_id
           WHERE e.status = 'active'
             AND l.rowid = (
               SELECT l2.rowid FROM locations l2
               WHERE l2.user_id = e.user_id
               ORDER BY l2.captured_at DESC, l2.rowid DESC
               LIMIT 1
             )
           ORDER BY e.started_at DESC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((
              row.get(0)?,
              RawSample {
                sample_id:   row.get(1)?,
                user_id:     row.get(2)?,
                alert_id:    row.get(3)?,
                latitude:    row.get(4)?,
                longitude:   row.get(5)?,
                accuracy:    row.get(6)?,
                captured_at: row.get(7)?,
                update_type: row.get(8)?,
              },
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    rows
      .into_iter()
      .map(|(alert_id, raw)| {
        let sample = raw.into_sample()?;
        Ok(LiveLocation { alert_id, user_id: sample.user_id, sample })
      })
      .collect()
  }
}
