use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::ServerMessage;

/// Opaque ID types for readability
pub type RoomId = String;
pub type UserId = String;

/// Interactive seats per room; further player joins become spectators.
pub const MAX_PLAYERS: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    Spectator,
}

/// Outbound frame queue for one attached socket. The registry holds the copy
/// used for fan-out; the socket task owns the receiving end.
pub type OutboundSender = UnboundedSender<ServerMessage>;

/// Canonical record for one attached client. Rooms reference it by user id;
/// the registry is the only owner of the transport handle.
#[derive(Debug, Clone)]
pub struct Connection {
    pub user_id: UserId,
    pub username: String,
    pub room_id: RoomId,
    pub role: Role,
    pub tx: OutboundSender,
}

/// One active game room. Created on first join, removed as soon as the last
/// member is gone.
#[derive(Debug, Clone, Default)]
pub struct Room {
    pub players: Vec<UserId>,
    pub spectators: Vec<UserId>,
    /// Opaque blob carried for the clients; the server never interprets it.
    pub game_state: Value,
}

impl Room {
    /// Seat a member, downgrading to spectator once both player seats are
    /// taken. The capacity rule lives here, not in the message router.
    pub fn seat(&mut self, user_id: &str, wants_player: bool) -> Role {
        if wants_player && self.players.len() < MAX_PLAYERS {
            self.players.push(user_id.to_string());
            Role::Player
        } else {
            self.spectators.push(user_id.to_string());
            Role::Spectator
        }
    }

    pub fn remove(&mut self, user_id: &str) {
        self.players.retain(|id| id != user_id);
        self.spectators.retain(|id| id != user_id);
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.spectators.is_empty()
    }

    pub fn stats(&self) -> RoomStats {
        RoomStats {
            players: self.players.len(),
            spectators: self.spectators.len(),
        }
    }

    /// Players first, then spectators. Delivery order across members carries
    /// no guarantee either way.
    pub fn member_ids(&self) -> impl Iterator<Item = &UserId> {
        self.players.iter().chain(self.spectators.iter())
    }
}

/// Live membership counts attached to presence events.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomStats {
    pub players: usize,
    pub spectators: usize,
}

/// One line of a room roster snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: UserId,
    pub username: String,
}
