//! Shared application state.

use std::sync::Arc;

use rally_shared::time::Clock;

use crate::usecase::{
    AnnounceOnlineUseCase, DisconnectUserUseCase, RespondGameInvitationUseCase,
    SendChannelMessageUseCase, SendDirectMessageUseCase, SendGameInvitationUseCase,
};

/// Shared application state handed to every socket handler.
pub struct AppState {
    pub announce_online_usecase: Arc<AnnounceOnlineUseCase>,
    pub disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    pub send_direct_message_usecase: Arc<SendDirectMessageUseCase>,
    pub send_game_invitation_usecase: Arc<SendGameInvitationUseCase>,
    pub respond_game_invitation_usecase: Arc<RespondGameInvitationUseCase>,
    pub send_channel_message_usecase: Arc<SendChannelMessageUseCase>,
    pub clock: Arc<dyn Clock>,
}
