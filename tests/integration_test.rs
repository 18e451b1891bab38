use pasalive::config::ServerConfig;
use pasalive::protocol::{ClientMessage, ServerMessage};
use pasalive::state::AppState;
use pasalive::types::RoomStats;
use pasalive::ws::handlers::handle_message;
use pasalive::ws::Session;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// A fake socket: a session plus the receiving end of its outbound queue.
struct TestClient {
    session: Session,
    rx: UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    fn connect() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(tx),
            rx,
        }
    }

    async fn send(&mut self, state: &Arc<AppState>, msg: ClientMessage) {
        handle_message(state, &mut self.session, msg).await;
    }

    async fn join(&mut self, state: &Arc<AppState>, room: &str, user: &str, name: &str, is_player: bool) {
        self.send(
            state,
            ClientMessage::JoinRoom {
                room_id: room.into(),
                user_id: user.into(),
                username: name.into(),
                is_player,
            },
        )
        .await;
    }

    /// Transport close, as the socket loop performs it.
    async fn disconnect(&mut self, state: &Arc<AppState>) {
        if let Some(user_id) = self.session.user_id.take() {
            state.disconnect(&user_id, &self.session.tx).await;
        }
    }

    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

fn new_state() -> Arc<AppState> {
    Arc::new(AppState::new(ServerConfig::default()))
}

/// End-to-end flow over one room: two players, one downgraded spectator,
/// chat, a relayed offer, a disconnect, and the final teardown.
#[tokio::test]
async fn test_full_room_flow() {
    let state = new_state();
    let mut a = TestClient::connect();
    let mut b = TestClient::connect();
    let mut c = TestClient::connect();

    // 1. A joins as player and gets presence plus the roster.
    a.join(&state, "r1", "a", "Ana", true).await;
    let msgs = a.drain();
    assert_eq!(msgs.len(), 2);
    match &msgs[0] {
        ServerMessage::UserJoined { user, room_stats } => {
            assert_eq!(user.id, "a");
            assert!(user.is_player);
            assert_eq!(*room_stats, RoomStats { players: 1, spectators: 0 });
        }
        other => panic!("expected user-joined, got {other:?}"),
    }
    match &msgs[1] {
        ServerMessage::RoomState { room } => {
            assert_eq!(room.id, "r1");
            assert_eq!(room.players.len(), 1);
            assert!(room.spectators.is_empty());
        }
        other => panic!("expected room-state, got {other:?}"),
    }

    // B joins as the second player; both hear about it.
    b.join(&state, "r1", "b", "Benito", true).await;
    assert!(a
        .drain()
        .iter()
        .any(|m| matches!(m, ServerMessage::UserJoined { user, .. } if user.id == "b")));
    let b_msgs = b.drain();
    assert!(matches!(
        b_msgs[0],
        ServerMessage::UserJoined { ref user, .. } if user.id == "b" && user.is_player
    ));
    match &b_msgs[1] {
        ServerMessage::RoomState { room } => {
            assert_eq!(room.players.len(), 2);
        }
        other => panic!("expected room-state, got {other:?}"),
    }

    // C wants to play but both seats are taken.
    c.join(&state, "r1", "c", "Carmen", true).await;
    let c_msgs = c.drain();
    match &c_msgs[0] {
        ServerMessage::UserJoined { user, room_stats } => {
            assert_eq!(user.id, "c");
            assert!(!user.is_player);
            assert_eq!(*room_stats, RoomStats { players: 2, spectators: 1 });
        }
        other => panic!("expected user-joined, got {other:?}"),
    }
    a.drain();
    b.drain();

    // 2. Chat from A reaches the whole room, sender included.
    a.send(
        &state,
        ClientMessage::ChatMessage {
            room_id: "r1".into(),
            user_id: "a".into(),
            username: "Ana".into(),
            text: "hola".into(),
        },
    )
    .await;
    for client in [&mut a, &mut b, &mut c] {
        let msgs = client.drain();
        assert_eq!(msgs.len(), 1);
        match &msgs[0] {
            ServerMessage::ChatMessage { user_id, text, .. } => {
                assert_eq!(user_id, "a");
                assert_eq!(text, "hola");
            }
            other => panic!("expected chat-message, got {other:?}"),
        }
    }

    // 3. A's offer to B lands only on B, stamped with the sender.
    a.send(
        &state,
        ClientMessage::WebrtcOffer {
            room_id: "r1".into(),
            target_user_id: "b".into(),
            offer: json!({"type": "offer", "sdp": "v=0"}),
        },
    )
    .await;
    let b_msgs = b.drain();
    assert_eq!(b_msgs.len(), 1);
    match &b_msgs[0] {
        ServerMessage::WebrtcOffer { offer, from_user_id } => {
            assert_eq!(from_user_id, "a");
            assert_eq!(offer["sdp"], "v=0");
        }
        other => panic!("expected webrtc-offer, got {other:?}"),
    }
    assert!(a.drain().is_empty());
    assert!(c.drain().is_empty());

    // 4. B's transport drops; survivors get user-left with fresh counts.
    b.disconnect(&state).await;
    for client in [&mut a, &mut c] {
        let msgs = client.drain();
        assert_eq!(msgs.len(), 1);
        match &msgs[0] {
            ServerMessage::UserLeft { user_id, room_stats } => {
                assert_eq!(user_id, "b");
                assert_eq!(*room_stats, RoomStats { players: 1, spectators: 1 });
            }
            other => panic!("expected user-left, got {other:?}"),
        }
    }

    // 5. Last members go; the room is deleted outright.
    a.send(
        &state,
        ClientMessage::LeaveRoom {
            user_id: "a".into(),
            room_id: "r1".into(),
        },
    )
    .await;
    c.disconnect(&state).await;
    assert_eq!(state.room_count().await, 0);
    assert_eq!(state.connection_count().await, 0);

    // A rejoin starts from a blank roster.
    let mut d = TestClient::connect();
    d.join(&state, "r1", "d", "Diana", true).await;
    let msgs = d.drain();
    match &msgs[1] {
        ServerMessage::RoomState { room } => {
            assert_eq!(room.players.len(), 1);
            assert!(room.spectators.is_empty());
        }
        other => panic!("expected room-state, got {other:?}"),
    }
}

#[tokio::test]
async fn test_every_player_join_after_capacity_becomes_spectator() {
    let state = new_state();
    let mut clients = Vec::new();
    for i in 0..5 {
        let mut client = TestClient::connect();
        client
            .join(&state, "r1", &format!("u{i}"), &format!("User{i}"), true)
            .await;
        clients.push(client);
    }

    let stats = state.room_stats("r1").await.unwrap();
    assert_eq!(stats, RoomStats { players: 2, spectators: 3 });
}

#[tokio::test]
async fn test_room_stats_follow_every_join_and_leave() {
    let state = new_state();
    let mut a = TestClient::connect();
    let mut b = TestClient::connect();
    let mut c = TestClient::connect();

    a.join(&state, "r1", "a", "A", true).await;
    b.join(&state, "r1", "b", "B", false).await;
    c.join(&state, "r1", "c", "C", true).await;
    a.drain();

    b.send(
        &state,
        ClientMessage::LeaveRoom {
            user_id: "b".into(),
            room_id: "r1".into(),
        },
    )
    .await;

    let msgs = a.drain();
    match msgs.last() {
        Some(ServerMessage::UserLeft { room_stats, .. }) => {
            assert_eq!(*room_stats, state.room_stats("r1").await.unwrap());
            assert_eq!(*room_stats, RoomStats { players: 2, spectators: 0 });
        }
        other => panic!("expected user-left, got {other:?}"),
    }
}

#[tokio::test]
async fn test_relay_to_absent_target_produces_nothing() {
    let state = new_state();
    let mut a = TestClient::connect();
    let mut b = TestClient::connect();
    a.join(&state, "r1", "a", "A", true).await;
    b.join(&state, "r1", "b", "B", true).await;
    a.drain();
    b.drain();

    a.send(
        &state,
        ClientMessage::WebrtcOffer {
            room_id: "r1".into(),
            target_user_id: "ghost".into(),
            offer: json!({"sdp": "v=0"}),
        },
    )
    .await;

    assert!(a.drain().is_empty());
    assert!(b.drain().is_empty());
}

#[tokio::test]
async fn test_double_disconnect_emits_single_user_left() {
    let state = new_state();
    let mut a = TestClient::connect();
    let mut b = TestClient::connect();
    a.join(&state, "r1", "a", "A", true).await;
    b.join(&state, "r1", "b", "B", true).await;
    a.drain();

    let b_tx = b.session.tx.clone();
    b.disconnect(&state).await;
    // The socket loop fires again for the same dead transport.
    state.disconnect("b", &b_tx).await;

    let left_events = a
        .drain()
        .into_iter()
        .filter(|m| matches!(m, ServerMessage::UserLeft { .. }))
        .count();
    assert_eq!(left_events, 1);
}

#[tokio::test]
async fn test_events_stay_inside_their_room() {
    let state = new_state();
    let mut a = TestClient::connect();
    let mut z = TestClient::connect();
    a.join(&state, "r1", "a", "A", true).await;
    z.join(&state, "r2", "z", "Z", true).await;
    a.drain();
    z.drain();

    a.send(
        &state,
        ClientMessage::ChatMessage {
            room_id: "r1".into(),
            user_id: "a".into(),
            username: "A".into(),
            text: "hola".into(),
        },
    )
    .await;
    a.send(
        &state,
        ClientMessage::GameAction {
            room_id: "r1".into(),
            action: "spin".into(),
            data: json!({"letter": "p"}),
        },
    )
    .await;

    assert_eq!(a.drain().len(), 2);
    assert!(z.drain().is_empty());
}

#[tokio::test]
async fn test_game_actions_update_state_and_reset_with_room() {
    let state = new_state();
    let mut a = TestClient::connect();
    a.join(&state, "r1", "a", "A", true).await;
    a.drain();

    a.send(
        &state,
        ClientMessage::GameAction {
            room_id: "r1".into(),
            action: "answer".into(),
            data: json!({"letter": "a", "correct": true}),
        },
    )
    .await;

    match a.drain().as_slice() {
        [ServerMessage::GameUpdate { action, data, user_id }] => {
            assert_eq!(action, "answer");
            assert_eq!(data["letter"], "a");
            assert_eq!(user_id, "a");
        }
        other => panic!("expected one game-update, got {other:?}"),
    }
    assert_eq!(state.game_state("r1").await.unwrap()["action"], "answer");

    // Tear the room down and recreate it: the blob starts over.
    a.disconnect(&state).await;
    let mut b = TestClient::connect();
    b.join(&state, "r1", "b", "B", true).await;
    assert!(state.game_state("r1").await.unwrap().is_null());
}

#[tokio::test]
async fn test_spectator_receives_relayed_negotiation_when_targeted() {
    let state = new_state();
    let mut a = TestClient::connect();
    let mut c = TestClient::connect();
    a.join(&state, "r1", "a", "A", true).await;
    c.join(&state, "r1", "c", "C", false).await;
    a.drain();
    c.drain();

    c.send(
        &state,
        ClientMessage::WebrtcIceCandidate {
            room_id: "r1".into(),
            target_user_id: "a".into(),
            candidate: json!({"candidate": "candidate:1 1 UDP", "sdpMid": "0"}),
        },
    )
    .await;

    match a.drain().as_slice() {
        [ServerMessage::WebrtcIceCandidate { candidate, from_user_id }] => {
            assert_eq!(from_user_id, "c");
            assert_eq!(candidate["sdpMid"], "0");
        }
        other => panic!("expected webrtc-ice-candidate, got {other:?}"),
    }
}
