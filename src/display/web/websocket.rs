//! WebSocket streaming of rendered frames.

use super::state::SharedState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// WebSocket upgrade handler. Refuses viewers beyond the configured limit.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> Response {
    if state.is_full().await {
        warn!("Refusing WebSocket viewer: connection limit reached");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    ws.on_upgrade(move |socket| async move {
        let Some(client) = state.register_client().await else {
            return;
        };
        handle_websocket(socket, state.clone(), client.id).await;
        state.remove_client(&client.id).await;
        info!("WebSocket viewer disconnected: {}", client.id);
    })
}

/// Send the current frame, then every published frame, until either side closes.
async fn handle_websocket(socket: WebSocket, state: SharedState, client_id: uuid::Uuid) {
    info!("WebSocket viewer connected: {}", client_id);

    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.subscribe();
    let current = state.current().await;

    let mut send_task = tokio::spawn(async move {
        if let Some(screen) = current {
            if let Ok(json) = serde_json::to_string(&screen) {
                if sender.send(Message::Text(json)).await.is_err() {
                    return;
                }
            }
        }

        loop {
            let screen = match rx.recv().await {
                Ok(screen) => screen,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Viewer {} skipped {} frames", client_id, skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            match serde_json::to_string(&screen) {
                Ok(json) => {
                    if let Err(e) = sender.send(Message::Text(json)).await {
                        warn!("Failed to send frame to viewer {}: {}", client_id, e);
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize frame for viewer {}: {}", client_id, e),
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error for viewer {}: {}", client_id, e);
                    break;
                }
            }
        }
    });

    // whichever side finishes first ends the session
    tokio::select! {
        _ = &mut send_task => {
            debug!("Send task completed for viewer {}", client_id);
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!("Receive task completed for viewer {}", client_id);
            send_task.abort();
        }
    }
}
