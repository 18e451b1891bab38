mod membership;

pub use membership::{JoinOutcome, LeaveSummary};

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::broadcast::fan_out;
use crate::config::ServerConfig;
use crate::protocol::ServerMessage;
use crate::types::{Connection, Room, RoomId, RoomStats, UserId};

/// Errors from registry operations. Callers log these; clients never see them.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("user {0} is not registered")]
    UnknownUser(UserId),
}

/// Shared application state: the room store plus the connection registry.
///
/// Both maps live behind one lock so a join, leave, or disconnect mutates
/// them atomically and no handler observes one index without the other.
/// Nothing outside this module and the broadcast engine touches the guard,
/// and no method holds it across an await point.
pub struct AppState {
    pub(crate) registry: RwLock<Registry>,
    pub config: ServerConfig,
}

#[derive(Default)]
pub(crate) struct Registry {
    pub rooms: HashMap<RoomId, Room>,
    pub connections: HashMap<UserId, Connection>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            config,
        }
    }

    pub async fn room_count(&self) -> usize {
        self.registry.read().await.rooms.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }

    pub async fn room_stats(&self, room_id: &str) -> Option<RoomStats> {
        self.registry
            .read()
            .await
            .rooms
            .get(room_id)
            .map(Room::stats)
    }

    pub async fn game_state(&self, room_id: &str) -> Option<Value> {
        self.registry
            .read()
            .await
            .rooms
            .get(room_id)
            .map(|room| room.game_state.clone())
    }

    pub async fn connection(&self, user_id: &str) -> Option<Connection> {
        self.registry.read().await.connections.get(user_id).cloned()
    }

    /// Record a game action into the room's opaque state blob and fan the
    /// update out to the whole room. Actions for unknown rooms are dropped.
    pub async fn apply_game_action(
        &self,
        room_id: &str,
        action: String,
        data: Value,
        user_id: UserId,
    ) {
        let mut guard = self.registry.write().await;
        let registry = &mut *guard;

        let Some(room) = registry.rooms.get_mut(room_id) else {
            tracing::debug!(room_id, "game-action for unknown room, dropping");
            return;
        };

        let update = ServerMessage::GameUpdate {
            action,
            data,
            user_id,
        };
        // The blob just holds the latest update envelope; the coordination
        // layer never reads it back.
        room.game_state = serde_json::to_value(&update).unwrap_or(Value::Null);

        fan_out(registry, room_id, &update, None);
    }
}
