//! Server execution logic.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use rally_shared::time::Clock;

use crate::domain::{ChannelRepository, Timestamp};
use crate::usecase::{
    AnnounceOnlineUseCase, DisconnectUserUseCase, RespondGameInvitationUseCase,
    SendChannelMessageUseCase, SendDirectMessageUseCase, SendGameInvitationUseCase,
};

use super::{
    handler::{health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Interval of the out-of-band sweep that clears expired mutes. The lazy
/// check on the message path does not depend on it.
const MUTE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the axum router for the relay endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws/presence", get(websocket_handler))
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Presence relay server.
pub struct Server {
    announce_online_usecase: Arc<AnnounceOnlineUseCase>,
    disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    send_direct_message_usecase: Arc<SendDirectMessageUseCase>,
    send_game_invitation_usecase: Arc<SendGameInvitationUseCase>,
    respond_game_invitation_usecase: Arc<RespondGameInvitationUseCase>,
    send_channel_message_usecase: Arc<SendChannelMessageUseCase>,
    channels: Arc<dyn ChannelRepository>,
    clock: Arc<dyn Clock>,
}

impl Server {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        announce_online_usecase: Arc<AnnounceOnlineUseCase>,
        disconnect_user_usecase: Arc<DisconnectUserUseCase>,
        send_direct_message_usecase: Arc<SendDirectMessageUseCase>,
        send_game_invitation_usecase: Arc<SendGameInvitationUseCase>,
        respond_game_invitation_usecase: Arc<RespondGameInvitationUseCase>,
        send_channel_message_usecase: Arc<SendChannelMessageUseCase>,
        channels: Arc<dyn ChannelRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            announce_online_usecase,
            disconnect_user_usecase,
            send_direct_message_usecase,
            send_game_invitation_usecase,
            respond_game_invitation_usecase,
            send_channel_message_usecase,
            channels,
            clock,
        }
    }

    /// Run the relay server until a shutdown signal arrives.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app_state = Arc::new(AppState {
            announce_online_usecase: self.announce_online_usecase,
            disconnect_user_usecase: self.disconnect_user_usecase,
            send_direct_message_usecase: self.send_direct_message_usecase,
            send_game_invitation_usecase: self.send_game_invitation_usecase,
            respond_game_invitation_usecase: self.respond_game_invitation_usecase,
            send_channel_message_usecase: self.send_channel_message_usecase,
            clock: self.clock.clone(),
        });

        let app = build_router(app_state);

        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!(
            "Rally presence relay listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws/presence", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        let sweep_task = spawn_mute_sweep(self.channels, self.clock);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        sweep_task.abort();
        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Spawn the periodic task that proactively clears expired mutes.
fn spawn_mute_sweep(
    channels: Arc<dyn ChannelRepository>,
    clock: Arc<dyn Clock>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MUTE_SWEEP_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let now = Timestamp::new(clock.now_millis());
            match channels.sweep_expired_mutes(now).await {
                Ok(cleared) if !cleared.is_empty() => {
                    tracing::info!("Cleared {} expired mutes", cleared.len());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Expired-mute sweep failed: {}", e);
                }
            }
        }
    })
}
