use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use carball_shared::protocol::{ClientMsg, ServerMsg};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};

use crate::relay::RelayCommand;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub relay_tx: mpsc::Sender<RelayCommand>,
    pub connection_semaphore: Arc<Semaphore>,
    pub max_message_bytes: usize,
    pub peer_queue_len: usize,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    let Ok(permit) = app_state.connection_semaphore.clone().try_acquire_owned() else {
        tracing::warn!("connection limit reached, refusing upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "server full").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, permit))
}

async fn handle_socket(socket: WebSocket, app_state: AppState, _permit: OwnedSemaphorePermit) {
    let (mut sink, mut stream) = socket.split();

    let (out_tx, mut out_rx) = mpsc::channel::<ServerMsg>(app_state.peer_queue_len);
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .relay_tx
        .send(RelayCommand::Connect {
            outbound: out_tx,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Connect command");
        return;
    }

    let peer = match resp_rx.await {
        Ok(peer) => peer,
        Err(_) => {
            tracing::error!("Failed to receive peer id");
            return;
        }
    };

    tracing::info!("Peer {} connected", peer);

    loop {
        tokio::select! {
            // Client -> Relay
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > app_state.max_message_bytes {
                            tracing::debug!(peer, len = text.len(), "oversized frame dropped");
                            continue;
                        }
                        // Malformed frames are dropped; the connection stays up
                        let Ok(msg) = serde_json::from_str::<ClientMsg>(&text) else {
                            tracing::debug!(peer, "unparseable frame dropped");
                            continue;
                        };
                        if app_state
                            .relay_tx
                            .send(RelayCommand::Message { peer, msg })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer, error = %e, "socket error");
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Relay -> Client
            out = out_rx.recv() => {
                let Some(msg) = out else {
                    break;
                };
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(peer, error = %e, "failed to encode message"),
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .relay_tx
        .send(RelayCommand::Disconnect { peer })
        .await;
    tracing::info!("Peer {} disconnected", peer);
}
