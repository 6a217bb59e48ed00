//! WebSocket endpoint for real-time SOS event streaming.
//!
//! Observers connect to `GET /sos/ws` and receive a JSON-encoded
//! [`SosEvent`] frame for every event the coordinator publishes after the
//! connection was established. All connected observers see the same
//! stream; which events a consumer acts on is its own concern.
//!
//! If an observer falls behind, lagged events are skipped and the
//! connection resumes from the most recent one — there is no replay for
//! parties that were not connected.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use raksha_core::{
  event::SosEvent,
  store::{EmergencyRegistry, LocationTrail},
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{AppState, auth::Requester};

/// `GET /sos/ws` — upgrade an authenticated request and begin streaming.
pub async fn observe<S>(
  ws: WebSocketUpgrade,
  State(state): State<AppState<S>>,
  _requester: Requester,
) -> impl IntoResponse
where
  S: EmergencyRegistry + LocationTrail + 'static,
{
  let rx = state.coordinator.subscribe();
  ws.on_upgrade(move |socket| stream_events(socket, rx))
}

/// Forward each published event as a text frame until either side hangs up.
async fn stream_events(
  mut socket: WebSocket,
  mut rx: broadcast::Receiver<SosEvent>,
) {
  debug!("observer connected");

  loop {
    tokio::select! {
      result = rx.recv() => {
        match result {
          Ok(event) => {
            let json = match serde_json::to_string(&event) {
              Ok(j) => j,
              Err(e) => {
                warn!("failed to serialize sos event: {e}");
                continue;
              }
            };
            if socket.send(Message::Text(json.into())).await.is_err() {
              debug!("observer disconnected (send failed)");
              return;
            }
          }
          Err(broadcast::error::RecvError::Lagged(n)) => {
            debug!(skipped = n, "observer lagged, skipping ahead");
          }
          Err(broadcast::error::RecvError::Closed) => {
            debug!("event channel closed, shutting down observer");
            return;
          }
        }
      }
      msg = socket.recv() => {
        match msg {
          Some(Ok(Message::Close(_))) | None => {
            debug!("observer disconnected");
            return;
          }
          Some(Ok(Message::Ping(data))) => {
            if socket.send(Message::Pong(data)).await.is_err() {
              debug!("observer disconnected (pong failed)");
              return;
            }
          }
          Some(Err(e)) => {
            debug!("observer socket error: {e}");
            return;
          }
          _ => {
            // Ignore text/binary frames from the observer side.
          }
        }
      }
    }
  }
}
