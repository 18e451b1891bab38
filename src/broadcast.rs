//! Room fan-out and single-target relay over registered outbound channels.
//!
//! Delivery is best-effort and unordered across members: a send into a hung-up
//! channel is skipped, and the member is reaped by its own disconnect event.

use crate::protocol::ServerMessage;
use crate::state::{AppState, Registry};

impl AppState {
    /// Deliver `msg` to every currently-connected member of `room_id`,
    /// optionally skipping one user id. Unknown rooms are a no-op.
    pub async fn broadcast_to_room(
        &self,
        room_id: &str,
        msg: &ServerMessage,
        exclude: Option<&str>,
    ) {
        let registry = self.registry.read().await;
        fan_out(&registry, room_id, msg, exclude);
    }

    /// Forward a message to a single registered user. Unknown or hung-up
    /// targets are dropped without feedback to the sender.
    pub async fn relay_to_user(&self, target_user_id: &str, msg: ServerMessage) {
        let registry = self.registry.read().await;
        match registry.connections.get(target_user_id) {
            Some(conn) => {
                if conn.tx.send(msg).is_err() {
                    tracing::debug!(%target_user_id, "relay target hung up, dropping");
                }
            }
            None => {
                tracing::debug!(%target_user_id, "relay target not connected, dropping");
            }
        }
    }
}

/// Fan a message out to a room while the registry lock is already held.
/// Membership operations call this so the counts inside `msg` and the
/// recipient set come from the same registry view.
pub(crate) fn fan_out(
    registry: &Registry,
    room_id: &str,
    msg: &ServerMessage,
    exclude: Option<&str>,
) {
    let Some(room) = registry.rooms.get(room_id) else {
        return;
    };
    for user_id in room.member_ids() {
        if exclude.is_some_and(|skip| skip == user_id) {
            continue;
        }
        let Some(conn) = registry.connections.get(user_id) else {
            continue;
        };
        if conn.tx.send(msg.clone()).is_err() {
            tracing::debug!(%user_id, room_id, "skipping closed connection");
        }
    }
}
