//! Conversation-side components of the client: the chat directory (listing,
//! presence, group management) and the chat room controller (history,
//! polling, composing).

use parley_api::ApiError;
use parley_session::SessionError;
use thiserror::Error;

mod directory;
mod room;

pub use directory::{ChatDirectory, MIN_GROUP_PARTICIPANTS};
pub use room::{ChatRoom, Phase, PollHandle};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("group name must not be empty")]
    MissingGroupName,
    #[error("a group chat needs at least {required} other participants, got {selected}")]
    NotEnoughParticipants { selected: usize, required: usize },
    #[error("no active conversation")]
    NoActiveConversation,
}

pub type ChatResult<T> = Result<T, ChatError>;
