//! Rally presence relay server.
//!
//! Accepts WebSocket connections on `/ws/presence` and routes presence,
//! chat, game invitation and channel events between connected users.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rally-server
//! cargo run --bin rally-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;

use rally_server::{
    infrastructure::{
        registry::WebSocketPresenceRegistry,
        repository::inmemory::{
            InMemoryChannelRepository, InMemoryDirectoryRepository, new_user_table,
        },
    },
    ui::Server,
    usecase::{
        AnnounceOnlineUseCase, DisconnectUserUseCase, RespondGameInvitationUseCase,
        SendChannelMessageUseCase, SendDirectMessageUseCase, SendGameInvitationUseCase,
    },
};
use rally_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "rally-server")]
#[command(about = "Presence and real-time messaging relay for the Rally platform", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "3000")]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Store collaborators (in-memory stand-ins; the platform wires in
    //    its relational store behind the same traits)
    // 2. Presence registry
    // 3. UseCases
    // 4. Server

    let users = new_user_table();
    let directory = Arc::new(InMemoryDirectoryRepository::new(users.clone()));
    let channels = Arc::new(InMemoryChannelRepository::new(users));
    let clock = Arc::new(SystemClock);

    let registry = Arc::new(WebSocketPresenceRegistry::new());

    let announce_online_usecase = Arc::new(AnnounceOnlineUseCase::new(registry.clone()));
    let disconnect_user_usecase = Arc::new(DisconnectUserUseCase::new(registry.clone()));
    let send_direct_message_usecase = Arc::new(SendDirectMessageUseCase::new(
        registry.clone(),
        directory.clone(),
    ));
    let send_game_invitation_usecase = Arc::new(SendGameInvitationUseCase::new(
        registry.clone(),
        directory.clone(),
    ));
    let respond_game_invitation_usecase =
        Arc::new(RespondGameInvitationUseCase::new(registry.clone()));
    let send_channel_message_usecase = Arc::new(SendChannelMessageUseCase::new(
        registry.clone(),
        channels.clone(),
        clock.clone(),
    ));

    let server = Server::new(
        announce_online_usecase,
        disconnect_user_usecase,
        send_direct_message_usecase,
        send_game_invitation_usecase,
        respond_game_invitation_usecase,
        send_channel_message_usecase,
        channels,
        clock,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
