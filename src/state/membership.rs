//! Join, leave, and disconnect operations.
//!
//! Each operation takes the registry write lock exactly once, so membership
//! mutation and the presence events derived from it stay consistent even
//! when sockets race each other.

use crate::broadcast::fan_out;
use crate::protocol::{JoinedUser, RoomSnapshot, ServerMessage};
use crate::state::{AppState, Registry, StateError};
use crate::types::{Connection, OutboundSender, Role, RoomId, RoomStats, RosterEntry};

/// What a join resolved to.
#[derive(Debug, Clone, Copy)]
pub struct JoinOutcome {
    pub role: Role,
    pub stats: RoomStats,
}

/// What a leave or disconnect changed.
#[derive(Debug, Clone)]
pub struct LeaveSummary {
    pub room_id: RoomId,
    pub stats: RoomStats,
    pub room_deleted: bool,
}

impl AppState {
    /// Register a connection and seat it in a room, creating the room on
    /// first use. The whole room (joiner included) gets `user-joined`; the
    /// joiner additionally gets the full roster, queued right after the
    /// presence event it appears in.
    ///
    /// A connection belongs to at most one room: joining under an id that is
    /// already registered counts as leaving the previous room first.
    pub async fn join_room(
        &self,
        room_id: &str,
        user_id: &str,
        username: &str,
        wants_player: bool,
        tx: OutboundSender,
    ) -> JoinOutcome {
        let mut guard = self.registry.write().await;
        let registry = &mut *guard;

        if registry.connections.contains_key(user_id) {
            if let Ok(previous) = remove_membership(registry, user_id) {
                tracing::info!(
                    %user_id,
                    previous_room = %previous.room_id,
                    "re-join under a registered id, left previous room"
                );
            }
        }

        let room = registry.rooms.entry(room_id.to_string()).or_default();
        let role = room.seat(user_id, wants_player);
        let stats = room.stats();

        registry.connections.insert(
            user_id.to_string(),
            Connection {
                user_id: user_id.to_string(),
                username: username.to_string(),
                room_id: room_id.to_string(),
                role,
                tx,
            },
        );

        let joined = ServerMessage::UserJoined {
            user: JoinedUser {
                id: user_id.to_string(),
                username: username.to_string(),
                is_player: role == Role::Player,
            },
            room_stats: stats,
        };
        fan_out(registry, room_id, &joined, None);

        let roster = snapshot(registry, room_id);
        if let Some(conn) = registry.connections.get(user_id) {
            let _ = conn.tx.send(ServerMessage::RoomState { room: roster });
        }

        tracing::info!(%user_id, room_id, ?role, "joined room");
        JoinOutcome { role, stats }
    }

    /// Explicit leave. Removes both the room membership and the registry
    /// entry; remaining members get `user-left` with fresh counts, and an
    /// emptied room is deleted on the spot.
    pub async fn leave_room(&self, user_id: &str) -> Result<LeaveSummary, StateError> {
        let mut guard = self.registry.write().await;
        let summary = remove_membership(&mut guard, user_id)?;
        tracing::info!(
            %user_id,
            room_id = %summary.room_id,
            room_deleted = summary.room_deleted,
            "left room"
        );
        Ok(summary)
    }

    /// Transport-close path, treated as an implicit leave. Idempotent: a
    /// socket whose registration is already gone, or was superseded by a
    /// newer socket reusing the same id, is a no-op.
    pub async fn disconnect(&self, user_id: &str, tx: &OutboundSender) {
        let mut guard = self.registry.write().await;
        let registry = &mut *guard;

        let owns_registration = match registry.connections.get(user_id) {
            Some(conn) => conn.tx.same_channel(tx),
            None => {
                tracing::debug!(%user_id, "disconnect for unregistered user, nothing to do");
                return;
            }
        };
        if !owns_registration {
            tracing::debug!(%user_id, "stale socket closed after its id was reclaimed");
            return;
        }

        if let Ok(summary) = remove_membership(registry, user_id) {
            tracing::info!(%user_id, room_id = %summary.room_id, "connection dropped");
        }
    }
}

/// Remove a user's registry entry and room membership in one step, notifying
/// the survivors. Err means the user was never registered.
fn remove_membership(registry: &mut Registry, user_id: &str) -> Result<LeaveSummary, StateError> {
    let conn = registry
        .connections
        .remove(user_id)
        .ok_or_else(|| StateError::UnknownUser(user_id.to_string()))?;
    let room_id = conn.room_id;

    let (stats, emptied) = match registry.rooms.get_mut(&room_id) {
        Some(room) => {
            room.remove(user_id);
            (room.stats(), room.is_empty())
        }
        None => {
            return Ok(LeaveSummary {
                room_id,
                stats: RoomStats::default(),
                room_deleted: false,
            })
        }
    };

    if emptied {
        registry.rooms.remove(&room_id);
        return Ok(LeaveSummary {
            room_id,
            stats,
            room_deleted: true,
        });
    }

    let left = ServerMessage::UserLeft {
        user_id: user_id.to_string(),
        room_stats: stats,
    };
    fan_out(registry, &room_id, &left, None);

    Ok(LeaveSummary {
        room_id,
        stats,
        room_deleted: false,
    })
}

/// Roster snapshot with display names resolved through the registry.
fn snapshot(registry: &Registry, room_id: &str) -> RoomSnapshot {
    let Some(room) = registry.rooms.get(room_id) else {
        return RoomSnapshot {
            id: room_id.to_string(),
            players: Vec::new(),
            spectators: Vec::new(),
        };
    };
    let entry = |user_id: &String| {
        registry.connections.get(user_id).map(|conn| RosterEntry {
            id: conn.user_id.clone(),
            username: conn.username.clone(),
        })
    };
    RoomSnapshot {
        id: room_id.to_string(),
        players: room.players.iter().filter_map(|id| entry(id)).collect(),
        spectators: room.spectators.iter().filter_map(|id| entry(id)).collect(),
    }
}
