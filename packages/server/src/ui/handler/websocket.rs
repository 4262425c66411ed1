//! WebSocket connection handlers.
//!
//! Connections arrive unauthenticated; identity is bound later by an
//! `online` frame. Frames from one connection are handled to completion
//! in receipt order inside its receive loop, so per-sender ordering needs
//! no extra machinery. Nothing in here propagates an error upward: every
//! rejected frame is logged and dropped, never answered with an error
//! frame and never allowed to take the process down.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use rally_shared::time::Clock;

use crate::{
    domain::{ChannelId, ConnectionId, MessageContent, PusherChannel, PusherMessage, UserId},
    infrastructure::dto::websocket::{
        ClientFrame, PresenceStatus, ServerEvent, parse_client_frame,
    },
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that forwards frames from the rx channel to the
/// WebSocket sender, closing the transport on a shutdown message.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<PusherMessage>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                PusherMessage::Frame(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                PusherMessage::Shutdown => {
                    // Evicted by a newer session for the same identity.
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id: ConnectionId = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    let (sender, mut receiver) = socket.split();

    tracing::debug!("Connection {} opened", connection_id);

    let mut send_task = pusher_loop(rx, sender);

    // Identity bound by the `online` frame, read again at teardown. The
    // send task may finish first (eviction), so it lives outside the
    // receive task.
    let authenticated: Arc<Mutex<Option<UserId>>> = Arc::new(Mutex::new(None));

    let state_clone = state.clone();
    let authenticated_clone = authenticated.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error on {}: {}", connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    dispatch_frame(
                        &state_clone,
                        &tx,
                        connection_id,
                        &authenticated_clone,
                        &text,
                    )
                    .await;
                }
                Message::Ping(_) => {
                    tracing::trace!("Received transport ping on {}", connection_id);
                }
                Message::Close(_) => {
                    tracing::debug!("Connection {} requested close", connection_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Tear down the registry entry, unless a newer connection owns it.
    let user_id = *authenticated.lock().await;
    if let Some(user_id) = user_id {
        let removed = state
            .disconnect_user_usecase
            .execute(user_id, connection_id)
            .await;
        if removed {
            let offline = ServerEvent::Presence {
                user_id: user_id.value(),
                status: PresenceStatus::Offline,
            };
            state
                .disconnect_user_usecase
                .broadcast_presence(user_id, &offline.to_json())
                .await;
            tracing::info!("User {} went offline", user_id);
        }
    }
    tracing::debug!("Connection {} closed", connection_id);
}

/// Route one inbound frame. Malformed and unauthorized frames are
/// dropped with a log line; the sender is never told.
async fn dispatch_frame(
    state: &Arc<AppState>,
    tx: &PusherChannel,
    connection_id: ConnectionId,
    authenticated: &Arc<Mutex<Option<UserId>>>,
    text: &str,
) {
    let frame = match parse_client_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Dropping frame on {}: {}", connection_id, e);
            return;
        }
    };

    match frame {
        ClientFrame::Online { user_id } => {
            let user_id = match UserId::new(user_id) {
                Ok(user_id) => user_id,
                Err(e) => {
                    tracing::warn!("Ignoring online frame on {}: {}", connection_id, e);
                    return;
                }
            };
            *authenticated.lock().await = Some(user_id);
            state
                .announce_online_usecase
                .execute(user_id, connection_id, tx.clone())
                .await;
            let online = ServerEvent::Presence {
                user_id: user_id.value(),
                status: PresenceStatus::Online,
            };
            state
                .announce_online_usecase
                .broadcast_presence(user_id, &online.to_json())
                .await;
            tracing::info!("User {} came online", user_id);
        }

        ClientFrame::Ping => {
            // Liveness probe; nothing to answer.
            tracing::trace!("Received ping on {}", connection_id);
        }

        ClientFrame::Chat {
            to,
            message,
            message_id,
        } => {
            let Some(from) = *authenticated.lock().await else {
                tracing::debug!("Chat frame on {} ignored: not authenticated", connection_id);
                return;
            };
            let to = match UserId::new(to) {
                Ok(to) => to,
                Err(e) => {
                    tracing::warn!("Chat frame on {} dropped: {}", connection_id, e);
                    return;
                }
            };
            let message_id = message_id.unwrap_or_else(|| {
                format!("ws-{}-{}-{}", from, to, state.clock.now_millis())
            });
            let chat = ServerEvent::Chat {
                from: from.value(),
                message: message.clone(),
                message_id: message_id.clone(),
            };
            let ack = ServerEvent::MessageSent {
                to: to.value(),
                message_id,
                message,
            };
            if let Err(e) = state
                .send_direct_message_usecase
                .execute(from, to, &chat.to_json(), &ack.to_json())
                .await
            {
                tracing::warn!("Chat from {} to {} failed: {}", from, to, e);
            }
        }

        ClientFrame::GameInvitation {
            to,
            from: _,
            from_name,
            invitation_id,
        } => {
            let Some(from) = *authenticated.lock().await else {
                tracing::debug!(
                    "Game invitation on {} ignored: not authenticated",
                    connection_id
                );
                return;
            };
            let to = match UserId::new(to) {
                Ok(to) => to,
                Err(e) => {
                    tracing::warn!("Game invitation on {} dropped: {}", connection_id, e);
                    return;
                }
            };
            // The forwarded frame carries the authenticated identity, not
            // whatever the client claimed in `from`.
            let invite = ServerEvent::GameInvitation {
                from: from.value(),
                from_name,
                invitation_id: invitation_id.clone(),
            };
            let ack = ServerEvent::GameInvitationSent {
                to: to.value(),
                invitation_id,
            };
            if let Err(e) = state
                .send_game_invitation_usecase
                .execute(from, to, &invite.to_json(), &ack.to_json())
                .await
            {
                tracing::warn!("Game invitation from {} to {} failed: {}", from, to, e);
            }
        }

        ClientFrame::GameInvitationResponse {
            to,
            from: _,
            invitation_id,
            response,
        } => {
            let Some(from) = *authenticated.lock().await else {
                tracing::debug!(
                    "Invitation response on {} ignored: not authenticated",
                    connection_id
                );
                return;
            };
            let to = match UserId::new(to) {
                Ok(to) => to,
                Err(e) => {
                    tracing::warn!("Invitation response on {} dropped: {}", connection_id, e);
                    return;
                }
            };
            let forwarded = ServerEvent::GameInvitationResponse {
                from: from.value(),
                invitation_id,
                response,
            };
            state
                .respond_game_invitation_usecase
                .execute(to, &forwarded.to_json())
                .await;
        }

        ClientFrame::ChannelMessage {
            channel_id,
            content,
            local_message_id,
        } => {
            let Some(sender) = *authenticated.lock().await else {
                tracing::debug!(
                    "Channel message on {} ignored: not authenticated",
                    connection_id
                );
                return;
            };
            let channel_id = match ChannelId::new(channel_id) {
                Ok(channel_id) => channel_id,
                Err(e) => {
                    tracing::warn!("Channel message on {} dropped: {}", connection_id, e);
                    return;
                }
            };
            let content = match MessageContent::new(content) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Channel message on {} dropped: {}", connection_id, e);
                    return;
                }
            };
            match state
                .send_channel_message_usecase
                .execute(sender, &channel_id, content)
                .await
            {
                Ok(receipt) => {
                    let event = ServerEvent::ChannelMessage {
                        channel_id: channel_id.as_str().to_string(),
                        message: receipt.message.clone().into(),
                        local_message_id,
                    };
                    state
                        .send_channel_message_usecase
                        .broadcast(&receipt.recipients, &event.to_json())
                        .await;
                }
                Err(e) => {
                    // Non-members and muted members get no feedback.
                    tracing::debug!(
                        "Channel message from {} to {} dropped: {}",
                        sender,
                        channel_id,
                        e
                    );
                }
            }
        }
    }
}
