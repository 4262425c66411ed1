//! WebSocket client session management.
//!
//! One `RelaySession` owns one logical connection to the relay. The
//! driver task announces presence on every (re)connect, drains the
//! pending queue oldest-first, sends heartbeat pings on a fixed
//! interval, and republishes parsed server frames on a broadcast
//! channel. The heartbeat timer lives inside the connection scope, so
//! no timer survives a dropped connection or a manual close.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use rally_server::infrastructure::dto::websocket::{
    ClientFrame, ServerEvent, parse_server_event,
};

use crate::backoff::ReconnectPolicy;
use crate::error::SessionError;
use crate::queue::PendingQueue;

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Events published by a session to its subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The transport is up and presence was announced.
    Connected,
    /// The transport dropped; a reconnect attempt follows.
    Disconnected,
    /// The retry budget is exhausted. Terminal: the surrounding
    /// application should prompt the user to reload.
    Failed,
    /// A parsed frame from the server.
    Server(ServerEvent),
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub url: String,
    pub user_id: i64,
    pub policy: ReconnectPolicy,
    pub heartbeat_interval: Duration,
}

impl SessionConfig {
    pub fn new(url: String, user_id: i64) -> Self {
        Self {
            url,
            user_id,
            policy: ReconnectPolicy::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

enum Command {
    Send(ClientFrame),
    Close,
}

/// Handle to a running relay session.
pub struct RelaySession {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SessionEvent>,
    driver: tokio::task::JoinHandle<()>,
}

impl RelaySession {
    /// Start the session driver. Connection and reconnection happen in
    /// the background; subscribe to observe progress.
    pub fn spawn(config: SessionConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(256);
        let driver = tokio::spawn(drive(config, command_rx, event_tx.clone()));
        Self {
            commands: command_tx,
            events: event_tx,
            driver,
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Hand a frame to the session. Sent immediately when connected,
    /// queued for the next reconnect otherwise.
    pub fn send(&self, frame: ClientFrame) -> Result<(), SessionError> {
        self.commands
            .send(Command::Send(frame))
            .map_err(|_| SessionError::Closed)
    }

    /// Close the session for good and wait for the driver to finish.
    /// No reconnect is attempted afterwards.
    pub async fn close(self) {
        let _ = self.commands.send(Command::Close);
        let _ = self.driver.await;
    }
}

enum ConnectionEnd {
    ManualClose,
    Lost,
}

async fn drive(
    config: SessionConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<SessionEvent>,
) {
    let mut queue = PendingQueue::new();
    let mut attempt: u32 = 0;

    loop {
        match connect_async(config.url.as_str()).await {
            Ok((ws, _)) => {
                attempt = 0;
                tracing::info!("Connected to {}", config.url);
                let _ = events.send(SessionEvent::Connected);
                match run_connection(&config, ws, &mut commands, &events, &mut queue).await {
                    ConnectionEnd::ManualClose => {
                        tracing::info!("Session closed");
                        return;
                    }
                    ConnectionEnd::Lost => {
                        tracing::warn!("Connection lost");
                        let _ = events.send(SessionEvent::Disconnected);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Connection attempt failed: {}", e);
            }
        }

        attempt += 1;
        let Some(delay) = config.policy.delay_for(attempt) else {
            tracing::error!(
                "Giving up after {} reconnect attempts; a manual reload is required",
                config.policy.max_attempts()
            );
            let _ = events.send(SessionEvent::Failed);
            return;
        };
        tracing::info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay,
            attempt,
            config.policy.max_attempts()
        );
        if !wait_before_retry(delay, &mut commands, &mut queue).await {
            tracing::info!("Session closed while waiting to reconnect");
            return;
        }
    }
}

/// Run one live connection to completion.
async fn run_connection(
    config: &SessionConfig,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    events: &broadcast::Sender<SessionEvent>,
    queue: &mut PendingQueue,
) -> ConnectionEnd {
    let (mut write, mut read) = ws.split();

    // Presence first: the server routes nothing for this connection
    // until the identity is bound.
    let online = ClientFrame::Online {
        user_id: config.user_id,
    };
    if write
        .send(Message::Text(online.to_json().into()))
        .await
        .is_err()
    {
        return ConnectionEnd::Lost;
    }

    // Flush frames queued during the outage, oldest first.
    while let Some(frame) = queue.pop() {
        if write
            .send(Message::Text(frame.to_json().into()))
            .await
            .is_err()
        {
            queue.push_front(frame);
            return ConnectionEnd::Lost;
        }
    }

    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + config.heartbeat_interval,
        config.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => match parse_server_event(&text) {
                    Ok(event) => {
                        let _ = events.send(SessionEvent::Server(event));
                    }
                    Err(e) => {
                        tracing::warn!("Ignoring unreadable server frame: {}", e);
                    }
                },
                Some(Ok(Message::Close(_))) | None => return ConnectionEnd::Lost,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return ConnectionEnd::Lost;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    if write
                        .send(Message::Text(frame.to_json().into()))
                        .await
                        .is_err()
                    {
                        // Keep the frame for the next connection.
                        queue.push_front(frame);
                        return ConnectionEnd::Lost;
                    }
                }
                Some(Command::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    return ConnectionEnd::ManualClose;
                }
            },
            _ = heartbeat.tick() => {
                if write
                    .send(Message::Text(ClientFrame::Ping.to_json().into()))
                    .await
                    .is_err()
                {
                    return ConnectionEnd::Lost;
                }
            }
        }
    }
}

/// Sleep out the backoff delay while still accepting frames into the
/// queue. Returns false if the session was closed during the wait.
async fn wait_before_retry(
    delay: Duration,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    queue: &mut PendingQueue,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            command = commands.recv() => match command {
                Some(Command::Send(frame)) => queue.push(frame),
                Some(Command::Close) | None => return false,
            }
        }
    }
}
