//! Handlers for `/locations` endpoints — standalone self-reports outside
//! any emergency trail.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/locations` | Body: `{"location": {...}, "update_type": "manual"}` |
//! | `GET`  | `/locations/latest` | The caller's most recent sample |
//! | `GET`  | `/locations/recent` | Optional `?limit=<n>` |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use raksha_core::{
  location::{LocationFix, LocationUpdateType},
  store::{EmergencyRegistry, LocationTrail},
};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, auth::Requester, error::ApiError};

/// Listing cap when the caller does not supply one.
const DEFAULT_RECENT_LIMIT: usize = 100;

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportBody {
  pub location:    LocationFix,
  /// `manual` (default) or `periodic`; `sos` is rejected here.
  pub update_type: Option<LocationUpdateType>,
}

/// `POST /locations`
pub async fn report<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
  Json(body): Json<ReportBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let sample = state
    .coordinator
    .record_location(
      requester.user_id,
      body.location,
      body.update_type.unwrap_or_default(),
    )
    .await?;

  Ok((
    StatusCode::CREATED,
    Json(json!({
      "success": true,
      "message": "location added",
      "location": sample,
    })),
  ))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /locations/latest`
pub async fn latest<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let sample = state.coordinator.latest_location(requester.user_id).await?;
  Ok(Json(json!({ "success": true, "location": sample })))
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub limit: Option<usize>,
}

/// `GET /locations/recent[?limit=<n>]`
pub async fn recent<S>(
  State(state): State<AppState<S>>,
  requester: Requester,
  Query(params): Query<RecentParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let samples = state
    .coordinator
    .recent_locations(
      requester.user_id,
      params.limit.unwrap_or(DEFAULT_RECENT_LIMIT),
    )
    .await?;
  Ok(Json(json!({ "success": true, "locations": samples })))
}
