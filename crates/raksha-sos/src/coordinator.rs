//! [`SosCoordinator`] — the single entry point for SOS operations.
//!
//! Orchestrates the registry, the trail, and the hub behind the public
//! trigger / report / resolve operations and the authorized reads. State
//! machine per emergency: `Active --resolve--> Resolved` (terminal), with
//! location reports as a self-loop on `Active`.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::broadcast;
use uuid::Uuid;

use raksha_core::{
  Error, Result,
  emergency::{Emergency, SosStats, SosStatus},
  event::SosEvent,
  location::{
    LiveLocation, LocationFix, LocationSample, LocationUpdateType,
    NewLocation,
  },
  store::{CreateOutcome, EmergencyRegistry, LocationTrail},
};

use crate::hub::EventHub;

/// Listing cap when the caller does not supply one.
const DEFAULT_LIST_LIMIT: usize = 100;

// ─── Views ───────────────────────────────────────────────────────────────────

/// An emergency with its full trail, oldest sample first.
#[derive(Debug, Clone)]
pub struct SosView {
  pub emergency: Emergency,
  pub trail:     Vec<LocationSample>,
}

/// An emergency with only its most recent sample, for list views.
#[derive(Debug, Clone)]
pub struct SosSummary {
  pub emergency: Emergency,
  pub latest:    Option<LocationSample>,
}

/// Tagged result of [`SosCoordinator::trigger`].
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
  /// A new emergency was opened and committed.
  Created(SosView),
  /// The user already had an active emergency; it is returned untouched
  /// and no event was published.
  AlreadyActive(Emergency),
}

/// What a trigger call produced.
#[derive(Debug, Clone)]
pub struct TriggerReceipt {
  pub outcome:       TriggerOutcome,
  /// Set when the initial sample failed to append after the emergency
  /// itself had already committed.
  pub trail_warning: Option<String>,
}

// ─── Per-alert locks ─────────────────────────────────────────────────────────

/// Keyed async locks serializing report_location against resolve for one
/// alert. Entries are bare mutexes and are never reclaimed; the set is
/// bounded by the alert ids this process has touched. Operations on
/// different alerts never contend.
#[derive(Default)]
struct AlertLocks {
  inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AlertLocks {
  fn for_alert(&self, alert_id: &str) -> Arc<tokio::sync::Mutex<()>> {
    // A poisoned map lock only means another thread panicked mid-insert;
    // the map itself is still usable.
    let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    map.entry(alert_id.to_owned()).or_default().clone()
  }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// The orchestrator callers interact with. Constructed once at process
/// start and shared by handle; holds no state of its own beyond the hub
/// and the lock table.
pub struct SosCoordinator<S> {
  store: Arc<S>,
  hub:   EventHub,
  locks: AlertLocks,
}

impl<S> SosCoordinator<S>
where
  S: EmergencyRegistry + LocationTrail,
{
  pub fn new(store: Arc<S>, hub: EventHub) -> Self {
    Self { store, hub, locks: AlertLocks::default() }
  }

  /// Attach a new observer to the event stream.
  pub fn subscribe(&self) -> broadcast::Receiver<SosEvent> {
    self.hub.subscribe()
  }

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Open a new emergency for `user_id`.
  ///
  /// If the user already has an active emergency it is returned under
  /// [`TriggerOutcome::AlreadyActive`] and nothing changes. A failure to
  /// append the optional initial sample after the registry insert has
  /// committed is downgraded to `trail_warning` — the emergency exists
  /// even when its first sample does not.
  pub async fn trigger(
    &self,
    user_id: Uuid,
    alert_id: &str,
    initial: Option<LocationFix>,
  ) -> Result<TriggerReceipt> {
    if alert_id.trim().is_empty() {
      return Err(Error::Validation("alert id must not be empty".to_string()));
    }

    let emergency = match self.store.create_active(user_id, alert_id).await? {
      CreateOutcome::AlreadyActive(existing) => {
        tracing::info!(
          %user_id,
          alert_id,
          existing = existing.alert_id,
          "trigger ignored: user already has an active emergency"
        );
        return Ok(TriggerReceipt {
          outcome:       TriggerOutcome::AlreadyActive(existing),
          trail_warning: None,
        });
      }
      CreateOutcome::Created(e) => e,
    };

    let mut trail = Vec::new();
    let mut trail_warning = None;
    if let Some(fix) = initial {
      let input = NewLocation::for_emergency(user_id, alert_id, fix);
      match self.store.append(input).await {
        Ok(sample) => trail.push(sample),
        Err(e) => {
          tracing::warn!(alert_id, error = %e, "initial location append failed");
          trail_warning =
            Some(format!("initial location was not recorded: {e}"));
        }
      }
    }

    tracing::info!(%user_id, alert_id, "emergency triggered");
    self.hub.publish(SosEvent::Triggered {
      emergency: emergency.clone(),
      trail: trail.clone(),
      user_id,
    });

    Ok(TriggerReceipt {
      outcome: TriggerOutcome::Created(SosView { emergency, trail }),
      trail_warning,
    })
  }

  /// Append a sample to an active emergency's trail.
  ///
  /// The sample is owned by the emergency's user even when relayed by
  /// someone else; `reporter` identifies the authenticated caller in the
  /// published event.
  pub async fn report_location(
    &self,
    alert_id: &str,
    reporter: Uuid,
    fix: LocationFix,
  ) -> Result<LocationSample> {
    let lock = self.locks.for_alert(alert_id);
    let _guard = lock.lock().await;

    let emergency = self
      .store
      .get_by_alert_id(alert_id)
      .await?
      .ok_or_else(|| Error::NotFound(alert_id.to_owned()))?;
    if !emergency.is_active() {
      return Err(Error::NotActive(alert_id.to_owned()));
    }

    let input = NewLocation::for_emergency(emergency.user_id, alert_id, fix);
    let sample = self.store.append(input).await?;

    self.hub.publish(SosEvent::LocationUpdated {
      alert_id: alert_id.to_owned(),
      sample:   sample.clone(),
      user_id:  reporter,
    });

    Ok(sample)
  }

  /// Transition an emergency to its terminal state.
  ///
  /// The requester must own the emergency or hold the privileged
  /// capability. The persisted resolver identity is recorded only for
  /// privileged resolution; a self-resolve records none.
  pub async fn resolve(
    &self,
    alert_id: &str,
    requester: Uuid,
    privileged: bool,
    notes: Option<String>,
  ) -> Result<Emergency> {
    let lock = self.locks.for_alert(alert_id);
    let _guard = lock.lock().await;

    let emergency = self
      .store
      .get_by_alert_id(alert_id)
      .await?
      .ok_or_else(|| Error::NotFound(alert_id.to_owned()))?;
    if emergency.user_id != requester && !privileged {
      return Err(Error::Unauthorized);
    }

    let resolver = privileged.then_some(requester);
    let resolved = self.store.resolve(alert_id, resolver, notes).await?;

    tracing::info!(alert_id, %requester, privileged, "emergency resolved");
    self.hub.publish(SosEvent::Resolved {
      alert_id:    alert_id.to_owned(),
      resolved_by: requester,
    });

    Ok(resolved)
  }

  /// Record a standalone manual or periodic self-report, outside any
  /// emergency trail.
  pub async fn record_location(
    &self,
    user_id: Uuid,
    fix: LocationFix,
    update_type: LocationUpdateType,
  ) -> Result<LocationSample> {
    if update_type == LocationUpdateType::Sos {
      return Err(Error::Validation(
        "sos samples must be reported against an emergency".to_string(),
      ));
    }
    self
      .store
      .append(NewLocation::standalone(user_id, fix, update_type))
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// One emergency with its full trail, visible to its owner and to
  /// privileged requesters.
  pub async fn get_visible(
    &self,
    alert_id: &str,
    requester: Uuid,
    privileged: bool,
  ) -> Result<SosView> {
    let emergency = self
      .store
      .get_by_alert_id(alert_id)
      .await?
      .ok_or_else(|| Error::NotFound(alert_id.to_owned()))?;
    if emergency.user_id != requester && !privileged {
      return Err(Error::Unauthorized);
    }

    let trail = self.store.trail_for(alert_id, true).await?;
    Ok(SosView { emergency, trail })
  }

  /// Emergencies the requester may see, optionally filtered by status,
  /// most recently started first. Privileged requesters see everyone's;
  /// others see only their own.
  pub async fn list_visible(
    &self,
    requester: Uuid,
    privileged: bool,
    status: Option<SosStatus>,
  ) -> Result<Vec<SosSummary>> {
    let emergencies = if privileged {
      match status {
        Some(SosStatus::Active) => self.store.list_active().await?,
        _ => self.store.list_all(status, DEFAULT_LIST_LIMIT).await?,
      }
    } else {
      self
        .store
        .list_for_user(requester, DEFAULT_LIST_LIMIT)
        .await?
        .into_iter()
        .filter(|e| status.is_none_or(|s| e.status == s))
        .collect()
    };

    self.summarize(emergencies).await
  }

  /// History listing. Privileged requesters may target one user's history
  /// via `user_id`; everyone else gets their own.
  pub async fn history_for(
    &self,
    requester: Uuid,
    privileged: bool,
    user_id: Option<Uuid>,
    limit: usize,
  ) -> Result<Vec<SosSummary>> {
    let emergencies = if privileged {
      match user_id {
        Some(target) => self.store.list_for_user(target, limit).await?,
        None => self.store.list_all(None, limit).await?,
      }
    } else {
      if user_id.is_some_and(|target| target != requester) {
        return Err(Error::Unauthorized);
      }
      self.store.list_for_user(requester, limit).await?
    };

    self.summarize(emergencies).await
  }

  /// The latest position of every user with an active emergency.
  /// Privileged only.
  pub async fn live_locations(
    &self,
    privileged: bool,
  ) -> Result<Vec<LiveLocation>> {
    if !privileged {
      return Err(Error::Unauthorized);
    }
    self.store.latest_for_active().await
  }

  /// Aggregate emergency counters. Privileged only.
  pub async fn sos_stats(&self, privileged: bool) -> Result<SosStats> {
    if !privileged {
      return Err(Error::Unauthorized);
    }
    self.store.stats().await
  }

  /// The requester's own most recent sample.
  pub async fn latest_location(
    &self,
    user_id: Uuid,
  ) -> Result<Option<LocationSample>> {
    self.store.latest_for(user_id).await
  }

  /// The requester's own recent samples, latest first.
  pub async fn recent_locations(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> Result<Vec<LocationSample>> {
    self.store.recent_for_user(user_id, limit).await
  }

  async fn summarize(
    &self,
    emergencies: Vec<Emergency>,
  ) -> Result<Vec<SosSummary>> {
    let mut out = Vec::with_capacity(emergencies.len());
    for emergency in emergencies {
      let latest = self
        .store
        .trail_for(&emergency.alert_id, false)
        .await?
        .into_iter()
        .next();
      out.push(SosSummary { emergency, latest });
    }
    Ok(out)
  }
}
