use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use regatta_shared::protocol::{ClientMsg, ServerMsg};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, OwnedSemaphorePermit, Semaphore};
use tower_http::cors::CorsLayer;

use crate::game_loop::{GameBroadcast, GameCommand};

/// Largest accepted client frame in bytes
pub const MAX_MESSAGE_BYTES: usize = 4096;
/// Malformed messages tolerated before the connection is dropped
pub const MAX_PARSE_ERRORS: u32 = 5;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub broadcast_tx: broadcast::Sender<GameBroadcast>,
    /// Flips to true once the game loop has stopped; connections then close
    pub closing: watch::Receiver<bool>,
    pub connection_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        game_tx: mpsc::Sender<GameCommand>,
        broadcast_tx: broadcast::Sender<GameBroadcast>,
        closing: watch::Receiver<bool>,
        max_connections: usize,
    ) -> Self {
        Self {
            game_tx,
            broadcast_tx,
            closing,
            connection_semaphore: Arc::new(Semaphore::new(max_connections)),
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    let permit = match app_state.connection_semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Connection refused: server full");
            return (StatusCode::SERVICE_UNAVAILABLE, "server full").into_response();
        }
    };
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, permit))
        .into_response()
}

async fn handle_socket(socket: WebSocket, app_state: AppState, _permit: OwnedSemaphorePermit) {
    let (mut sink, mut stream) = socket.split();
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();
    let mut closing = app_state.closing.clone();

    let mut my_id: Option<u32> = None;
    let mut parse_errors = 0u32;

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Socket error: {}", e);
                        break;
                    }
                    _ => continue, // Ignore ping/pong/binary
                };

                if text.len() > MAX_MESSAGE_BYTES {
                    tracing::warn!("Dropping connection {:?}: {} byte message", my_id, text.len());
                    break;
                }

                let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        parse_errors += 1;
                        tracing::warn!("Bad message from {:?}: {}", my_id, e);
                        if parse_errors >= MAX_PARSE_ERRORS {
                            break;
                        }
                        continue;
                    }
                };

                match client_msg {
                    ClientMsg::PlayerJoin { name } => {
                        if my_id.is_some() {
                            tracing::debug!("Repeated join from {:?} ignored", my_id);
                            continue;
                        }
                        let (resp_tx, resp_rx) = oneshot::channel();
                        if app_state
                            .game_tx
                            .send(GameCommand::PlayerJoin { name, response: resp_tx })
                            .await
                            .is_err()
                        {
                            tracing::error!("Failed to send PlayerJoin command");
                            break;
                        }
                        let reply = match resp_rx.await {
                            Ok(reply) => reply,
                            Err(_) => {
                                tracing::error!("Failed to receive player id");
                                break;
                            }
                        };
                        my_id = Some(reply.id);
                        tracing::info!("Player {} connected", reply.id);

                        let Ok(json) = serde_json::to_string(&ServerMsg::PlayerId(reply)) else {
                            break;
                        };
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    ClientMsg::BoatUpdate(update) => {
                        let Some(id) = my_id else {
                            tracing::warn!("boat_update before player_join ignored");
                            continue;
                        };
                        let _ = app_state
                            .game_tx
                            .send(GameCommand::BoatUpdate { id, update })
                            .await;
                    }
                }
            }

            // Server -> Client (broadcast)
            result = broadcast_rx.recv() => {
                match result {
                    Ok(GameBroadcast::GameState(msg)) => {
                        if let Ok(json) = serde_json::to_string(&ServerMsg::GameState(msg)) {
                            if sink.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Player {:?} lagged by {} messages", my_id, n);
                        // Continue - game_state is a full snapshot, the next one supersedes
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Server shutting down
            _ = closing.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    // Cleanup on disconnect
    if let Some(id) = my_id {
        let _ = app_state
            .game_tx
            .send(GameCommand::PlayerLeave { id })
            .await;
        tracing::info!("Player {} disconnected", id);
    }
}
