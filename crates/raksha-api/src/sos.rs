//! Handlers for `/sos` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sos/trigger` | 201 + emergency with trail; 409 if already active |
//! | `POST` | `/sos/update_location` | 200; 400 once resolved |
//! | `POST` | `/sos/resolve` | Owner or privileged; 404/403/409 |
//! | `GET`  | `/sos/active` | Own emergencies unless privileged |
//! | `GET`  | `/sos/history` | Optional `?user_id` (privileged) and `?limit` |
//! | `GET`  | `/sos/live` | Privileged: latest position per active user |
//! | `GET`  | `/sos/stats` | Privileged: aggregate counters |
//! | `GET`  | `/sos/{alert_id}` | 404 if missing, 403 unless visible |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use raksha_core::{
  emergency::{Emergency, SosStatus},
  location::{LocationFix, LocationSample},
  store::{EmergencyRegistry, LocationTrail},
};
use raksha_sos::{SosSummary, SosView, TriggerOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, auth::Requester, error::ApiError};

/// History page size when the caller does not supply one.
const DEFAULT_HISTORY_LIMIT: usize = 50;

// ─── Wire DTOs ───────────────────────────────────────────────────────────────

/// Emergency payload as the clients consume it — the stored fields plus the
/// computed duration.
#[derive(Debug, Serialize)]
pub struct EmergencyDto {
  pub alert_id:         String,
  pub user_id:          Uuid,
  pub status:           SosStatus,
  pub started_at:       DateTime<Utc>,
  pub ended_at:         Option<DateTime<Utc>>,
  pub resolved_by:      Option<Uuid>,
  pub notes:            Option<String>,
  pub duration_seconds: i64,
}

impl From<&Emergency> for EmergencyDto {
  fn from(e: &Emergency) -> Self {
    Self {
      alert_id:         e.alert_id.clone(),
      user_id:          e.user_id,
      status:           e.status,
      started_at:       e.started_at,
      ended_at:         e.ended_at,
      resolved_by:      e.resolved_by,
      notes:            e.notes.clone(),
      duration_seconds: e.duration_seconds(),
    }
  }
}

/// Detail payload: emergency fields plus the full trail, oldest first.
#[derive(Debug, Serialize)]
pub struct SosViewDto {
  #[serde(flatten)]
  pub emergency: EmergencyDto,
  pub trail:     Vec<LocationSample>,
}

impl From<&SosView> for SosViewDto {
  fn from(v: &SosView) -> Self {
    Self {
      emergency: EmergencyDto::from(&v.emergency),
      trail:     v.trail.clone(),
    }
  }
}

/// List payload: emergency fields plus only the most recent sample.
#[derive(Debug, Serialize)]
pub struct SosSummaryDto {
  #[serde(flatten)]
  pub emergency:       EmergencyDto,
  pub latest_location: Option<LocationSample>,
}

impl From<&SosSummary> for SosSummaryDto {
  fn from(s: &SosSummary) -> Self {
    Self {
      emergency:       EmergencyDto::from(&s.emergency),
      latest_location: s.latest.clone(),
    }
  }
}

fn summaries(items: &[SosSummary]) -> Vec<SosSummaryDto> {
  items.iter().map(SosSummaryDto::from).collect()
}

// ─── Trigger ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TriggerBody {
  pub alert_id: String,
  /// Initial position, recorded as the first trail sample when present.
  pub location: Option<LocationFix>,
}

/// `POST /sos/trigger`
pub async fn trigger<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
  Json(body): Json<TriggerBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let receipt = state
    .coordinator
    .trigger(requester.user_id, &body.alert_id, body.location)
    .await?;

  match receipt.outcome {
    TriggerOutcome::Created(view) => Ok((
      StatusCode::CREATED,
      Json(json!({
        "success": true,
        "message": "emergency created",
        "sos": SosViewDto::from(&view),
        "warning": receipt.trail_warning,
      })),
    )),
    TriggerOutcome::AlreadyActive(existing) => Err(ApiError::Conflict(format!(
      "an active emergency already exists: {}",
      existing.alert_id
    ))),
  }
}

// ─── Update location ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateLocationBody {
  pub alert_id: String,
  pub location: LocationFix,
}

/// `POST /sos/update_location`
pub async fn update_location<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
  Json(body): Json<UpdateLocationBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let sample = state
    .coordinator
    .report_location(&body.alert_id, requester.user_id, body.location)
    .await?;

  Ok(Json(json!({
    "success": true,
    "message": "location updated",
    "location": sample,
  })))
}

// ─── Resolve ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
  pub alert_id: String,
  pub notes:    Option<String>,
}

/// `POST /sos/resolve`
pub async fn resolve<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
  Json(body): Json<ResolveBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let resolved = state
    .coordinator
    .resolve(
      &body.alert_id,
      requester.user_id,
      requester.privileged,
      body.notes,
    )
    .await?;

  Ok(Json(json!({
    "success": true,
    "message": "emergency resolved",
    "sos": EmergencyDto::from(&resolved),
  })))
}

// ─── Listings ────────────────────────────────────────────────────────────────

/// `GET /sos/active`
pub async fn active<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let items = state
    .coordinator
    .list_visible(
      requester.user_id,
      requester.privileged,
      Some(SosStatus::Active),
    )
    .await?;

  Ok(Json(json!({ "success": true, "sos_events": summaries(&items) })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  /// Privileged only: inspect one user's history.
  pub user_id: Option<Uuid>,
  pub limit:   Option<usize>,
}

/// `GET /sos/history[?user_id=<uuid>][&limit=<n>]`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
  Query(params): Query<HistoryParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let items = state
    .coordinator
    .history_for(
      requester.user_id,
      requester.privileged,
      params.user_id,
      params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
    )
    .await?;

  Ok(Json(json!({ "success": true, "sos_events": summaries(&items) })))
}

/// `GET /sos/live` — privileged only.
pub async fn live<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let locations = state.coordinator.live_locations(requester.privileged).await?;
  Ok(Json(json!({ "success": true, "locations": locations })))
}

/// `GET /sos/stats` — privileged only.
pub async fn stats<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let stats = state.coordinator.sos_stats(requester.privileged).await?;
  Ok(Json(json!({ "success": true, "stats": stats })))
}

// ─── Detail ──────────────────────────────────────────────────────────────────

/// `GET /sos/{alert_id}`
pub async fn detail<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
  Path(alert_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let view = state
    .coordinator
    .get_visible(&alert_id, requester.user_id, requester.privileged)
    .await?;

  Ok(Json(json!({ "success": true, "sos": SosViewDto::from(&view) })))
}
