//! Wire messages exchanged with clients.
//!
//! Frames are UTF-8 JSON text, externally tagged with a kebab-case `type`
//! field and camelCase keys, decoded once at the transport boundary. Payloads
//! the server only relays (SDP offers, ICE candidates, game data) stay
//! `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{RoomId, RoomStats, RosterEntry, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        user_id: UserId,
        username: String,
        is_player: bool,
    },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { user_id: UserId, room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        room_id: RoomId,
        user_id: UserId,
        username: String,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcOffer {
        room_id: RoomId,
        target_user_id: UserId,
        offer: Value,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcAnswer {
        room_id: RoomId,
        target_user_id: UserId,
        answer: Value,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcIceCandidate {
        room_id: RoomId,
        target_user_id: UserId,
        candidate: Value,
    },
    #[serde(rename_all = "camelCase")]
    GameAction {
        room_id: RoomId,
        action: String,
        data: Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    UserJoined {
        user: JoinedUser,
        room_stats: RoomStats,
    },
    #[serde(rename_all = "camelCase")]
    RoomState { room: RoomSnapshot },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        user_id: UserId,
        room_stats: RoomStats,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        id: String,
        user_id: UserId,
        username: String,
        text: String,
        timestamp: String,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcOffer { offer: Value, from_user_id: UserId },
    #[serde(rename_all = "camelCase")]
    WebrtcAnswer { answer: Value, from_user_id: UserId },
    #[serde(rename_all = "camelCase")]
    WebrtcIceCandidate {
        candidate: Value,
        from_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    GameUpdate {
        action: String,
        data: Value,
        user_id: UserId,
    },
}

/// Presence payload for `user-joined`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedUser {
    pub id: UserId,
    pub username: String,
    pub is_player: bool,
}

/// Full roster, sent to a joiner only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub players: Vec<RosterEntry>,
    pub spectators: Vec<RosterEntry>,
}
