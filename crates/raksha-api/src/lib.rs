//! JSON REST + WebSocket API for the Raksha SOS service.
//!
//! Exposes an axum [`Router`] backed by any store implementing the registry
//! and trail traits. TLS and reverse-proxy concerns are the deployment's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = raksha_api::router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod error;
pub mod locations;
pub mod sos;
pub mod ws;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use raksha_core::store::{EmergencyRegistry, LocationTrail};
use raksha_sos::SosCoordinator;
use serde::Deserialize;

use auth::AuthConfig;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `RAKSHA_`-prefixed environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Accounts accepted by HTTP Basic auth.
  #[serde(default)]
  pub principals: Vec<auth::Principal>,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub coordinator: Arc<SosCoordinator<S>>,
  pub auth:        Arc<AuthConfig>,
}

// Manual impl: `S` itself need not be `Clone`, only the `Arc`s are cloned.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      coordinator: Arc::clone(&self.coordinator),
      auth:        Arc::clone(&self.auth),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for the given state.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  Router::new()
    // SOS lifecycle
    .route("/sos/trigger",         post(sos::trigger::<S>))
    .route("/sos/update_location", post(sos::update_location::<S>))
    .route("/sos/resolve",         post(sos::resolve::<S>))
    .route("/sos/active",          get(sos::active::<S>))
    .route("/sos/history",         get(sos::history::<S>))
    .route("/sos/live",            get(sos::live::<S>))
    .route("/sos/stats",           get(sos::stats::<S>))
    .route("/sos/ws",              get(ws::observe::<S>))
    .route("/sos/{alert_id}",      get(sos::detail::<S>))
    // Standalone location reports
    .route("/locations",           post(locations::report::<S>))
    .route("/locations/latest",    get(locations::latest::<S>))
    .route("/locations/recent",    get(locations::recent::<S>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use rand_core::OsRng;
  use raksha_sos::EventHub;
  use raksha_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  struct TestCtx {
    state: AppState<SqliteStore>,
    asha:  Uuid,
    staff: Uuid,
  }

  const PASSWORD: &str = "secret";

  fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  async fn make_ctx() -> TestCtx {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let coordinator =
      Arc::new(SosCoordinator::new(Arc::new(store), EventHub::new()));

    let asha = Uuid::new_v4();
    let staff = Uuid::new_v4();
    let hashed = hash(PASSWORD);

    let auth = AuthConfig {
      principals: vec![
        auth::Principal {
          user_id:       asha,
          username:      "asha".to_string(),
          password_hash: hashed.clone(),
          privileged:    false,
        },
        auth::Principal {
          user_id:       Uuid::new_v4(),
          username:      "neha".to_string(),
          password_hash: hashed.clone(),
          privileged:    false,
        },
        auth::Principal {
          user_id:       staff,
          username:      "staff".to_string(),
          password_hash: hashed,
          privileged:    true,
        },
      ],
    };

    TestCtx {
      state: AppState { coordinator, auth: Arc::new(auth) },
      asha,
      staff,
    }
  }

  fn basic(user: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{PASSWORD}")))
  }

  async fn request(
    ctx: &TestCtx,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(u) = user {
      builder = builder.header(header::AUTHORIZATION, basic(u));
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router(ctx.state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
  }

  fn trigger_body(alert_id: &str) -> Value {
    json!({
      "alert_id": alert_id,
      "location": { "latitude": 12.97, "longitude": 77.59, "accuracy": 8.0 },
    })
  }

  // ── Auth ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unauthenticated_requests_return_401() {
    let ctx = make_ctx().await;
    let req = Request::builder()
      .method("GET")
      .uri("/sos/active")
      .body(Body::empty())
      .unwrap();
    let resp = router(ctx.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn wrong_password_returns_401() {
    let ctx = make_ctx().await;
    let req = Request::builder()
      .method("GET")
      .uri("/sos/active")
      .header(
        header::AUTHORIZATION,
        format!("Basic {}", B64.encode("asha:wrong")),
      )
      .body(Body::empty())
      .unwrap();
    let resp = router(ctx.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Trigger ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn trigger_returns_201_with_trail() {
    let ctx = make_ctx().await;
    let (status, body) = request(
      &ctx,
      "POST",
      "/sos/trigger",
      Some("asha"),
      Some(trigger_body("a1")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["sos"]["alert_id"], "a1");
    assert_eq!(body["sos"]["status"], "active");
    assert_eq!(body["sos"]["user_id"], ctx.asha.to_string());
    assert_eq!(body["sos"]["trail"].as_array().unwrap().len(), 1);
    assert!(body["sos"]["duration_seconds"].is_i64());
    assert!(body["warning"].is_null());
  }

  #[tokio::test]
  async fn second_trigger_returns_409() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;

    let (status, body) = request(
      &ctx,
      "POST",
      "/sos/trigger",
      Some("asha"),
      Some(trigger_body("a2")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("a1"));
  }

  #[tokio::test]
  async fn trigger_with_empty_alert_id_returns_400() {
    let ctx = make_ctx().await;
    let (status, _) = request(
      &ctx,
      "POST",
      "/sos/trigger",
      Some("asha"),
      Some(json!({ "alert_id": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn trigger_with_missing_alert_id_is_a_client_error() {
    let ctx = make_ctx().await;
    let (status, _) = request(
      &ctx,
      "POST",
      "/sos/trigger",
      Some("asha"),
      Some(json!({ "location": { "latitude": 1.0, "longitude": 2.0 } })),
    )
    .await;
    assert!(status.is_client_error(), "status: {status}");
  }

  // ── Update location ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn update_location_appends_to_the_trail() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;

    let (status, body) = request(
      &ctx,
      "POST",
      "/sos/update_location",
      Some("asha"),
      Some(json!({
        "alert_id": "a1",
        "location": { "latitude": 13.0, "longitude": 77.6 },
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"]["update_type"], "sos");

    let (_, detail) =
      request(&ctx, "GET", "/sos/a1", Some("asha"), None).await;
    assert_eq!(detail["sos"]["trail"].as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn update_location_after_resolve_returns_400() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;
    request(
      &ctx,
      "POST",
      "/sos/resolve",
      Some("asha"),
      Some(json!({ "alert_id": "a1" })),
    )
    .await;

    let (status, _) = request(
      &ctx,
      "POST",
      "/sos/update_location",
      Some("asha"),
      Some(json!({
        "alert_id": "a1",
        "location": { "latitude": 1.0, "longitude": 2.0 },
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn update_location_on_unknown_alert_returns_404() {
    let ctx = make_ctx().await;
    let (status, _) = request(
      &ctx,
      "POST",
      "/sos/update_location",
      Some("asha"),
      Some(json!({
        "alert_id": "missing",
        "location": { "latitude": 1.0, "longitude": 2.0 },
      })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Resolve ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn self_resolve_returns_200_with_null_resolver() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;

    let (status, body) = request(
      &ctx,
      "POST",
      "/sos/resolve",
      Some("asha"),
      Some(json!({ "alert_id": "a1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sos"]["status"], "resolved");
    assert!(body["sos"]["resolved_by"].is_null());
    assert!(!body["sos"]["ended_at"].is_null());
  }

  #[tokio::test]
  async fn staff_resolve_records_the_resolver() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;

    let (status, body) = request(
      &ctx,
      "POST",
      "/sos/resolve",
      Some("staff"),
      Some(json!({ "alert_id": "a1", "notes": "handled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sos"]["resolved_by"], ctx.staff.to_string());
    assert_eq!(body["sos"]["notes"], "handled");
  }

  #[tokio::test]
  async fn stranger_resolve_returns_403() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;

    let (status, _) = request(
      &ctx,
      "POST",
      "/sos/resolve",
      Some("neha"),
      Some(json!({ "alert_id": "a1" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn resolve_missing_returns_404_and_repeat_returns_409() {
    let ctx = make_ctx().await;

    let (status, _) = request(
      &ctx,
      "POST",
      "/sos/resolve",
      Some("asha"),
      Some(json!({ "alert_id": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;
    request(
      &ctx,
      "POST",
      "/sos/resolve",
      Some("asha"),
      Some(json!({ "alert_id": "a1" })),
    )
    .await;
    let (status, _) = request(
      &ctx,
      "POST",
      "/sos/resolve",
      Some("asha"),
      Some(json!({ "alert_id": "a1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  // ── Detail ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn detail_is_visible_to_owner_and_staff_only() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;

    let (status, body) = request(&ctx, "GET", "/sos/a1", Some("asha"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sos"]["alert_id"], "a1");

    let (status, _) = request(&ctx, "GET", "/sos/a1", Some("staff"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&ctx, "GET", "/sos/a1", Some("neha"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
      request(&ctx, "GET", "/sos/missing", Some("asha"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Listings ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn active_listing_is_scoped_by_privilege() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;
    request(&ctx, "POST", "/sos/trigger", Some("neha"), Some(trigger_body("n1"))).await;

    let (_, own) = request(&ctx, "GET", "/sos/active", Some("asha"), None).await;
    let own_events = own["sos_events"].as_array().unwrap();
    assert_eq!(own_events.len(), 1);
    assert_eq!(own_events[0]["alert_id"], "a1");
    assert!(!own_events[0]["latest_location"].is_null());

    let (_, all) = request(&ctx, "GET", "/sos/active", Some("staff"), None).await;
    assert_eq!(all["sos_events"].as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn history_user_param_requires_privilege() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;
    request(
      &ctx,
      "POST",
      "/sos/resolve",
      Some("asha"),
      Some(json!({ "alert_id": "a1" })),
    )
    .await;

    let (_, own) = request(&ctx, "GET", "/sos/history", Some("asha"), None).await;
    assert_eq!(own["sos_events"].as_array().unwrap().len(), 1);

    let uri = format!("/sos/history?user_id={}", ctx.asha);
    let (status, targeted) =
      request(&ctx, "GET", &uri, Some("staff"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(targeted["sos_events"].as_array().unwrap().len(), 1);

    let (status, _) = request(&ctx, "GET", &uri, Some("neha"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn live_and_stats_are_staff_only() {
    let ctx = make_ctx().await;
    request(&ctx, "POST", "/sos/trigger", Some("asha"), Some(trigger_body("a1"))).await;

    let (status, _) = request(&ctx, "GET", "/sos/live", Some("asha"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = request(&ctx, "GET", "/sos/stats", Some("asha"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, live) = request(&ctx, "GET", "/sos/live", Some("staff"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["locations"].as_array().unwrap().len(), 1);
    assert_eq!(live["locations"][0]["alert_id"], "a1");

    let (status, stats) =
      request(&ctx, "GET", "/sos/stats", Some("staff"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["stats"]["active"], 1);
    assert_eq!(stats["stats"]["total"], 1);
  }

  // ── Standalone locations ────────────────────────────────────────────────

  #[tokio::test]
  async fn location_report_and_reads_round_trip() {
    let ctx = make_ctx().await;

    let (status, body) = request(
      &ctx,
      "POST",
      "/locations",
      Some("asha"),
      Some(json!({ "location": { "latitude": 12.9, "longitude": 77.5 } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["location"]["update_type"], "manual");
    assert!(body["location"]["alert_id"].is_null());

    let (status, latest) =
      request(&ctx, "GET", "/locations/latest", Some("asha"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["location"]["latitude"], 12.9);

    let (_, recent) =
      request(&ctx, "GET", "/locations/recent?limit=10", Some("asha"), None)
        .await;
    assert_eq!(recent["locations"].as_array().unwrap().len(), 1);

    // Another user's reads are empty — reads are scoped to the caller.
    let (_, other) =
      request(&ctx, "GET", "/locations/latest", Some("neha"), None).await;
    assert!(other["location"].is_null());
  }
}
