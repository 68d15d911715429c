/// Live per-session event stream over WebSocket
///
/// Each broadcast event becomes one JSON text frame. Delivery is
/// best-effort: observers that lag lose the oldest events and should
/// reconcile via the session snapshot endpoint on (re)connect.
use crate::context::ApiContext;
use crate::error::ApiError;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use mailsurge_core::models::events::SessionEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub async fn stream(
    State(ctx): State<Arc<ApiContext>>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if ctx.store.get(&session_id).is_none() {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    let receiver = ctx.events.subscribe(&session_id);
    debug!(session_id = %session_id, "Event stream observer connected");
    Ok(ws.on_upgrade(move |socket| forward_events(socket, receiver, session_id)))
}

async fn forward_events(
    socket: WebSocket,
    mut receiver: broadcast::Receiver<SessionEvent>,
    session_id: String,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(session_id = %session_id, error = %e, "Failed to encode event");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        session_id = %session_id,
                        skipped = skipped,
                        "Observer lagged, events dropped"
                    );
                }
                // Channel removed at session cleanup: the stream is over
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(_)) => break,
                // Pings are answered by axum; other client frames are noise
                Some(Ok(_)) => {}
            },
        }
    }

    debug!(session_id = %session_id, "Event stream observer disconnected");
}
