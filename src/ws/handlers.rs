//! WebSocket message dispatch
//!
//! Single entry point for inbound frames. Every message kind is matched
//! exhaustively, so extending the protocol forces an update here rather than
//! falling through a string switch.

use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{Role, UserId};
use crate::ws::Session;

pub async fn handle_message(state: &Arc<AppState>, session: &mut Session, msg: ClientMessage) {
    match msg {
        ClientMessage::JoinRoom {
            room_id,
            user_id,
            username,
            is_player,
        } => {
            let outcome = state
                .join_room(&room_id, &user_id, &username, is_player, session.tx.clone())
                .await;
            if is_player && outcome.role == Role::Spectator {
                tracing::info!(
                    %user_id,
                    %room_id,
                    "player seats taken, joined as spectator"
                );
            }
            session.user_id = Some(user_id);
        }

        ClientMessage::LeaveRoom { user_id, room_id } => {
            match state.leave_room(&user_id).await {
                Ok(summary) => {
                    if summary.room_id != room_id {
                        tracing::warn!(
                            %user_id,
                            claimed = %room_id,
                            actual = %summary.room_id,
                            "leave-room named a different room than the registration"
                        );
                    }
                    if session.user_id.as_deref() == Some(user_id.as_str()) {
                        session.user_id = None;
                    }
                }
                Err(e) => tracing::debug!("leave-room ignored: {}", e),
            }
        }

        ClientMessage::ChatMessage {
            room_id,
            user_id,
            username,
            text,
        } => {
            let event = ServerMessage::ChatMessage {
                id: ulid::Ulid::new().to_string(),
                user_id,
                username,
                text,
                timestamp: chrono::Utc::now().to_rfc3339(),
            };
            state.broadcast_to_room(&room_id, &event, None).await;
        }

        ClientMessage::WebrtcOffer {
            target_user_id,
            offer,
            ..
        } => {
            if let Some(from_user_id) = sender_identity(session, "webrtc-offer") {
                state
                    .relay_to_user(
                        &target_user_id,
                        ServerMessage::WebrtcOffer { offer, from_user_id },
                    )
                    .await;
            }
        }

        ClientMessage::WebrtcAnswer {
            target_user_id,
            answer,
            ..
        } => {
            if let Some(from_user_id) = sender_identity(session, "webrtc-answer") {
                state
                    .relay_to_user(
                        &target_user_id,
                        ServerMessage::WebrtcAnswer { answer, from_user_id },
                    )
                    .await;
            }
        }

        ClientMessage::WebrtcIceCandidate {
            target_user_id,
            candidate,
            ..
        } => {
            if let Some(from_user_id) = sender_identity(session, "webrtc-ice-candidate") {
                state
                    .relay_to_user(
                        &target_user_id,
                        ServerMessage::WebrtcIceCandidate {
                            candidate,
                            from_user_id,
                        },
                    )
                    .await;
            }
        }

        ClientMessage::GameAction {
            room_id,
            action,
            data,
        } => {
            let Some(user_id) = session.user_id.clone() else {
                tracing::warn!(%room_id, "game-action from a socket that never joined, dropping");
                return;
            };
            state.apply_game_action(&room_id, action, data, user_id).await;
        }
    }
}

/// Relayed and game frames carry the sender's identity, which only exists
/// after a join; frames from an unjoined socket are dropped.
fn sender_identity(session: &Session, kind: &str) -> Option<UserId> {
    if session.user_id.is_none() {
        tracing::warn!(kind, "frame from a socket that never joined, dropping");
    }
    session.user_id.clone()
}
