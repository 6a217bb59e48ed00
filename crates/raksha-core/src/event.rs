//! Broadcast event payloads published by the coordinator.
//!
//! Events are published synchronously with the state change that caused
//! them, on the task performing the mutation, so any one observer sees a
//! given emergency's events in the order the mutations committed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{emergency::Emergency, location::LocationSample};

/// One lifecycle or location event for a single emergency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SosEvent {
  /// A new emergency was opened.
  Triggered {
    emergency: Emergency,
    /// The trail as of the trigger — the initial sample when one was
    /// supplied and recorded.
    trail:     Vec<LocationSample>,
    user_id:   Uuid,
  },

  /// A sample was appended to an active emergency's trail.
  LocationUpdated {
    alert_id: String,
    sample:   LocationSample,
    /// The authenticated user who reported the position.
    user_id:  Uuid,
  },

  /// The emergency reached its terminal state.
  Resolved {
    alert_id:    String,
    /// The requester who performed the resolution, owner or staff.
    resolved_by: Uuid,
  },
}

impl SosEvent {
  /// The alert this event belongs to.
  pub fn alert_id(&self) -> &str {
    match self {
      SosEvent::Triggered { emergency, .. } => &emergency.alert_id,
      SosEvent::LocationUpdated { alert_id, .. } => alert_id,
      SosEvent::Resolved { alert_id, .. } => alert_id,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::emergency::SosStatus;

  #[test]
  fn serializes_with_event_tag() {
    let event = SosEvent::Resolved {
      alert_id:    "a1".to_string(),
      resolved_by: Uuid::new_v4(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "resolved");
    assert_eq!(json["alert_id"], "a1");
  }

  #[test]
  fn alert_id_accessor_covers_all_variants() {
    let emergency = Emergency {
      alert_id:    "a2".to_string(),
      user_id:     Uuid::new_v4(),
      status:      SosStatus::Active,
      started_at:  chrono::Utc::now(),
      ended_at:    None,
      resolved_by: None,
      notes:       None,
    };
    let user_id = emergency.user_id;
    let event = SosEvent::Triggered { emergency, trail: vec![], user_id };
    assert_eq!(event.alert_id(), "a2");
  }
}
