//! UseCase layer: one routed operation per module.

pub mod announce_online;
pub mod disconnect_user;
pub mod moderation;
pub mod respond_game_invitation;
pub mod send_channel_message;
pub mod send_direct_message;
pub mod send_game_invitation;

pub use announce_online::AnnounceOnlineUseCase;
pub use disconnect_user::DisconnectUserUseCase;
pub use moderation::ChannelModerationUseCase;
pub use respond_game_invitation::RespondGameInvitationUseCase;
pub use send_channel_message::{
    ChannelMessageReceipt, SendChannelMessageError, SendChannelMessageUseCase,
};
pub use send_direct_message::{DirectMessageOutcome, SendDirectMessageUseCase};
pub use send_game_invitation::{InvitationDeliveryOutcome, SendGameInvitationUseCase};
