pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::protocol::ClientMessage;
use crate::state::AppState;
use crate::types::{OutboundSender, UserId};

/// Per-socket context threaded through the message router.
pub struct Session {
    /// Outbound frame queue; a clone is registered in the connection
    /// registry once this socket joins a room.
    pub tx: OutboundSender,
    /// Identity this socket registered with, set by join-room.
    pub user_id: Option<UserId>,
}

impl Session {
    pub fn new(tx: OutboundSender) -> Self {
        Self { tx, user_id: None }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one client connection: pump queued outbound frames into the sink
/// and parse inbound text frames for the router. A malformed frame is
/// dropped without closing the socket; a transport error only ends this
/// connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::new(tx);

    tracing::debug!("websocket attached");

    loop {
        tokio::select! {
            Some(outbound) = rx.recv() => {
                match serde_json::to_string(&outbound) {
                    Ok(json) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize outbound frame: {}", e);
                    }
                }
            }

            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("received frame: {}", text);
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => {
                                handlers::handle_message(&state, &mut session, msg).await;
                            }
                            Err(e) => {
                                tracing::warn!("discarding unparseable frame: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::debug!("websocket closed by client");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("websocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Transport gone: implicit leave. disconnect() is idempotent, so a close
    // racing an explicit leave-room is harmless.
    if let Some(user_id) = session.user_id.take() {
        state.disconnect(&user_id, &session.tx).await;
    }
    tracing::debug!("websocket detached");
}
