//! Integration tests driving the relay over real WebSocket connections.
//!
//! Each test boots the axum router on an ephemeral port with isolated
//! in-memory collaborators, then talks to it through tokio-tungstenite
//! sockets the way a browser tab would.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use rally_server::domain::{
    ChannelId, ChannelInfo, ChannelMembership, ChannelRepository, Timestamp, UserId, UserProfile,
};
use rally_server::infrastructure::registry::WebSocketPresenceRegistry;
use rally_server::infrastructure::repository::inmemory::{
    InMemoryChannelRepository, InMemoryDirectoryRepository, new_user_table,
};
use rally_server::ui::{AppState, build_router};
use rally_server::usecase::{
    AnnounceOnlineUseCase, ChannelModerationUseCase, DisconnectUserUseCase,
    RespondGameInvitationUseCase, SendChannelMessageUseCase, SendDirectMessageUseCase,
    SendGameInvitationUseCase,
};
use rally_shared::time::SystemClock;

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

struct Relay {
    addr: std::net::SocketAddr,
    directory: Arc<InMemoryDirectoryRepository>,
    channels: Arc<InMemoryChannelRepository>,
    moderation: ChannelModerationUseCase,
}

async fn start_relay() -> Relay {
    let users = new_user_table();
    let directory = Arc::new(InMemoryDirectoryRepository::new(users.clone()));
    let channels = Arc::new(InMemoryChannelRepository::new(users));
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(WebSocketPresenceRegistry::new());

    let state = Arc::new(AppState {
        announce_online_usecase: Arc::new(AnnounceOnlineUseCase::new(registry.clone())),
        disconnect_user_usecase: Arc::new(DisconnectUserUseCase::new(registry.clone())),
        send_direct_message_usecase: Arc::new(SendDirectMessageUseCase::new(
            registry.clone(),
            directory.clone(),
        )),
        send_game_invitation_usecase: Arc::new(SendGameInvitationUseCase::new(
            registry.clone(),
            directory.clone(),
        )),
        respond_game_invitation_usecase: Arc::new(RespondGameInvitationUseCase::new(
            registry.clone(),
        )),
        send_channel_message_usecase: Arc::new(SendChannelMessageUseCase::new(
            registry.clone(),
            channels.clone(),
            clock.clone(),
        )),
        clock: clock.clone(),
    });

    let moderation = ChannelModerationUseCase::new(
        registry.clone(),
        channels.clone(),
        directory.clone(),
        clock,
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Relay {
        addr,
        directory,
        channels,
        moderation,
    }
}

async fn connect(relay: &Relay) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{}/ws/presence", relay.addr))
        .await
        .expect("failed to connect");
    ws
}

async fn connect_as(relay: &Relay, user_id: i64) -> WsClient {
    let mut ws = connect(relay).await;
    send_json(
        &mut ws,
        &serde_json::json!({"type": "online", "userId": user_id}),
    )
    .await;
    ws
}

async fn send_json(ws: &mut WsClient, value: &serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("failed to send frame");
}

async fn recv_frame(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("frame is not valid JSON");
        }
    }
}

async fn assert_silent(ws: &mut WsClient) {
    let result = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(result.is_err(), "expected no frame, got {:?}", result);
}

async fn seed_user(relay: &Relay, id: i64, name: &str) {
    relay
        .directory
        .add_user(UserProfile {
            id: UserId::new(id).unwrap(),
            display_name: name.to_string(),
            avatar_url: None,
        })
        .await;
}

async fn seed_channel(relay: &Relay, channel: &str, members: &[(i64, bool)]) {
    let channel_id = ChannelId::new(channel.to_string()).unwrap();
    relay
        .channels
        .create_channel(ChannelInfo {
            id: channel_id.clone(),
            name: channel.to_string(),
        })
        .await;
    for (idx, (id, is_admin)) in members.iter().enumerate() {
        relay
            .channels
            .add_member(ChannelMembership {
                user_id: UserId::new(*id).unwrap(),
                channel_id: channel_id.clone(),
                display_name: format!("player-{id}"),
                is_admin: *is_admin,
                is_muted: false,
                mute_end_time: None,
                joined_at: Timestamp::new(idx as i64 * 100),
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_two_user_chat_scenario() {
    // given: users 1 and 2 announce presence
    let relay = start_relay().await;
    let mut alice = connect_as(&relay, 1).await;
    let mut bob = connect_as(&relay, 2).await;

    // user 1 learns that user 2 came online (and not about itself)
    let presence = recv_frame(&mut alice).await;
    assert_eq!(presence["type"], "presence");
    assert_eq!(presence["userId"], 2);
    assert_eq!(presence["status"], "online");

    // when: user 1 sends a chat frame to user 2
    send_json(
        &mut alice,
        &serde_json::json!({"type": "chat", "to": 2, "message": "hi", "messageId": "m1"}),
    )
    .await;

    // then: user 2 receives the message and user 1 the acknowledgement
    let chat = recv_frame(&mut bob).await;
    assert_eq!(chat["type"], "chat");
    assert_eq!(chat["from"], 1);
    assert_eq!(chat["message"], "hi");
    assert_eq!(chat["messageId"], "m1");

    let ack = recv_frame(&mut alice).await;
    assert_eq!(ack["type"], "message_sent");
    assert_eq!(ack["to"], 2);
    assert_eq!(ack["messageId"], "m1");
    assert_eq!(ack["message"], "hi");
}

#[tokio::test]
async fn test_own_presence_is_not_echoed() {
    // given:
    let relay = start_relay().await;

    // when: a single user announces presence
    let mut alice = connect_as(&relay, 1).await;

    // then: their own transition is not played back to them
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_offline_recipient_still_gets_sender_ack() {
    // given: only user 1 is online
    let relay = start_relay().await;
    let mut alice = connect_as(&relay, 1).await;

    // when: user 1 writes to an offline user
    send_json(
        &mut alice,
        &serde_json::json!({"type": "chat", "to": 5, "message": "anyone there?", "messageId": "m2"}),
    )
    .await;

    // then: the acknowledgement arrives anyway
    let ack = recv_frame(&mut alice).await;
    assert_eq!(ack["type"], "message_sent");
    assert_eq!(ack["to"], 5);
}

#[tokio::test]
async fn test_block_suppresses_chat_one_way() {
    // given: user 2 has blocked user 1
    let relay = start_relay().await;
    relay
        .directory
        .block(UserId::new(2).unwrap(), UserId::new(1).unwrap())
        .await;
    let mut alice = connect_as(&relay, 1).await;
    let mut bob = connect_as(&relay, 2).await;
    recv_frame(&mut alice).await; // presence of user 2

    // when: the blocked sender writes to the blocker
    send_json(
        &mut alice,
        &serde_json::json!({"type": "chat", "to": 2, "message": "hello?", "messageId": "m3"}),
    )
    .await;

    // then: nothing reaches the blocker and the sender gets no ack either
    assert_silent(&mut bob).await;
    assert_silent(&mut alice).await;

    // and the blocker's own outbound chat is unaffected
    send_json(
        &mut bob,
        &serde_json::json!({"type": "chat", "to": 1, "message": "one way", "messageId": "m4"}),
    )
    .await;
    let chat = recv_frame(&mut alice).await;
    assert_eq!(chat["type"], "chat");
    assert_eq!(chat["from"], 2);
}

#[tokio::test]
async fn test_duplicate_session_is_evicted() {
    // given: user 1 is online in one tab
    let relay = start_relay().await;
    let mut first = connect_as(&relay, 1).await;

    // when: a second tab announces the same identity
    let mut second = connect_as(&relay, 1).await;

    // then: the first transport is closed by the server
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match first.next().await {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "evicted connection was not closed");

    // and directed sends reach only the second session
    let mut charlie = connect_as(&relay, 3).await;
    recv_frame(&mut second).await; // presence of user 3
    send_json(
        &mut charlie,
        &serde_json::json!({"type": "chat", "to": 1, "message": "still there?", "messageId": "m5"}),
    )
    .await;
    let chat = recv_frame(&mut second).await;
    assert_eq!(chat["type"], "chat");
    assert_eq!(chat["from"], 3);
}

#[tokio::test]
async fn test_unauthenticated_frames_are_dropped() {
    // given: a connection that never announced presence
    let relay = start_relay().await;
    let mut anon = connect(&relay).await;
    let mut bob = connect_as(&relay, 2).await;

    // when:
    send_json(
        &mut anon,
        &serde_json::json!({"type": "chat", "to": 2, "message": "ghost", "messageId": "m6"}),
    )
    .await;

    // then:
    assert_silent(&mut bob).await;
    assert_silent(&mut anon).await;
}

#[tokio::test]
async fn test_game_invitation_round_trip() {
    // given:
    let relay = start_relay().await;
    let mut alice = connect_as(&relay, 1).await;
    let mut bob = connect_as(&relay, 2).await;
    recv_frame(&mut alice).await; // presence of user 2

    // when: user 1 invites user 2
    send_json(
        &mut alice,
        &serde_json::json!({
            "type": "game_invitation",
            "to": 2,
            "from": 1,
            "fromName": "alice",
            "invitationId": "inv-1"
        }),
    )
    .await;

    // then: the invite reaches the target and the ack the inviter
    let invite = recv_frame(&mut bob).await;
    assert_eq!(invite["type"], "game_invitation");
    assert_eq!(invite["from"], 1);
    assert_eq!(invite["fromName"], "alice");
    assert_eq!(invite["invitationId"], "inv-1");

    let ack = recv_frame(&mut alice).await;
    assert_eq!(ack["type"], "game_invitation_sent");
    assert_eq!(ack["invitationId"], "inv-1");

    // and the response comes back to the inviter
    send_json(
        &mut bob,
        &serde_json::json!({
            "type": "game_invitation_response",
            "to": 1,
            "from": 2,
            "invitationId": "inv-1",
            "response": "accepted"
        }),
    )
    .await;
    let response = recv_frame(&mut alice).await;
    assert_eq!(response["type"], "game_invitation_response");
    assert_eq!(response["from"], 2);
    assert_eq!(response["response"], "accepted");
}

#[tokio::test]
async fn test_invitation_to_offline_target_yields_no_ack() {
    // given:
    let relay = start_relay().await;
    let mut alice = connect_as(&relay, 1).await;

    // when: the target is offline
    send_json(
        &mut alice,
        &serde_json::json!({
            "type": "game_invitation",
            "to": 9,
            "from": 1,
            "fromName": "alice",
            "invitationId": "inv-2"
        }),
    )
    .await;

    // then: no delivery ack; the sender must assume non-delivery
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_channel_message_echo_and_membership() {
    // given: channel with members 1 and 2; user 3 is no member
    let relay = start_relay().await;
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
        seed_user(&relay, id, name).await;
    }
    seed_channel(&relay, "arena", &[(1, true), (2, false)]).await;
    let mut alice = connect_as(&relay, 1).await;
    let mut bob = connect_as(&relay, 2).await;
    let mut carol = connect_as(&relay, 3).await;
    recv_frame(&mut alice).await; // presence of user 2
    recv_frame(&mut alice).await; // presence of user 3
    recv_frame(&mut bob).await; // presence of user 3

    // when: a member posts
    send_json(
        &mut bob,
        &serde_json::json!({
            "type": "channel_message",
            "channelId": "arena",
            "content": "good game",
            "localMessageId": "tmp-1"
        }),
    )
    .await;

    // then: every member gets the echo, the sender included
    for ws in [&mut alice, &mut bob] {
        let echo = recv_frame(ws).await;
        assert_eq!(echo["type"], "channel_message");
        assert_eq!(echo["channelId"], "arena");
        assert_eq!(echo["message"]["content"], "good game");
        assert_eq!(echo["message"]["user"]["id"], 2);
        assert_eq!(echo["localMessageId"], "tmp-1");
    }
    assert_silent(&mut carol).await;

    // and a non-member posting is silently dropped
    send_json(
        &mut carol,
        &serde_json::json!({
            "type": "channel_message",
            "channelId": "arena",
            "content": "let me in"
        }),
    )
    .await;
    assert_silent(&mut alice).await;
    assert_silent(&mut bob).await;
    assert_silent(&mut carol).await;
}

#[tokio::test]
async fn test_kick_scenario_notifications_and_drop() {
    // given: channel with members 1, 2 (admin), 3, everyone online
    let relay = start_relay().await;
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
        seed_user(&relay, id, name).await;
    }
    seed_channel(&relay, "arena", &[(1, false), (2, true), (3, false)]).await;
    let mut alice = connect_as(&relay, 1).await;
    let mut bob = connect_as(&relay, 2).await;
    let mut carol = connect_as(&relay, 3).await;
    recv_frame(&mut alice).await; // presence of user 2
    recv_frame(&mut alice).await; // presence of user 3
    recv_frame(&mut bob).await; // presence of user 3

    // when: admin 2 kicks member 1
    relay
        .moderation
        .kick(
            UserId::new(2).unwrap(),
            &ChannelId::new("arena".to_string()).unwrap(),
            UserId::new(1).unwrap(),
        )
        .await
        .unwrap();

    // then: the kicked member gets the directed notice
    let directed = recv_frame(&mut alice).await;
    assert_eq!(directed["type"], "you_were_kicked");
    assert_eq!(directed["channelId"], "arena");
    assert_eq!(directed["adminId"], 2);

    // and the remaining members see the broadcast naming member 1
    for ws in [&mut bob, &mut carol] {
        let broadcast = recv_frame(ws).await;
        assert_eq!(broadcast["type"], "channel_user_kicked");
        assert_eq!(broadcast["userId"], 1);
    }

    // and subsequent channel messages from member 1 are dropped
    send_json(
        &mut alice,
        &serde_json::json!({
            "type": "channel_message",
            "channelId": "arena",
            "content": "but why"
        }),
    )
    .await;
    assert_silent(&mut bob).await;
    assert_silent(&mut carol).await;
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_malformed_and_unknown_frames_are_ignored() {
    // given:
    let relay = start_relay().await;
    let mut alice = connect_as(&relay, 1).await;

    // when: garbage, an unknown type, and a frame missing a field arrive
    alice
        .send(Message::Text("{not json".to_string().into()))
        .await
        .unwrap();
    send_json(&mut alice, &serde_json::json!({"type": "warp", "x": 1})).await;
    send_json(&mut alice, &serde_json::json!({"type": "chat", "to": 2})).await;

    // then: the connection survives and stays usable
    send_json(
        &mut alice,
        &serde_json::json!({"type": "chat", "to": 9, "message": "still alive", "messageId": "m7"}),
    )
    .await;
    let ack = recv_frame(&mut alice).await;
    assert_eq!(ack["type"], "message_sent");
}
