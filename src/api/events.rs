//! WebSocket refresh push.
//!
//! Each connected client receives one content-less `refresh` text frame per
//! document change and re-fetches over the task endpoints; no task data
//! travels on this socket. A client that falls behind collapses missed
//! signals into the next frame.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;

use super::routes::AppState;

/// GET /api/events
pub async fn events_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_loop(socket, state))
}

async fn client_loop(mut socket: WebSocket, state: Arc<AppState>) {
    let mut refreshes = state.notifier.subscribe();
    loop {
        tokio::select! {
            signal = refreshes.recv() => {
                let send = match signal {
                    Ok(()) => true,
                    // Missed signals are idempotent for the client: one
                    // refresh frame covers all of them.
                    Err(RecvError::Lagged(_)) => true,
                    Err(RecvError::Closed) => break,
                };
                if send
                    && socket
                        .send(Message::Text("refresh".to_string()))
                        .await
                        .is_err()
                {
                    break;
                }
            }
            message = socket.recv() => {
                match message {
                    // Inbound frames (pings, stray text) are ignored.
                    Some(Ok(_)) => continue,
                    _ => break,
                }
            }
        }
    }
    tracing::debug!("events subscriber disconnected");
}
