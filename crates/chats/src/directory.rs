//! Chat list, presence, and group management. Thin request/response
//! wrappers; nothing here caches beyond the current call.

use std::sync::Arc;

use parley_api::{Conversation, Identity};
use parley_session::SessionStore;
use tracing::info;

use crate::{ChatError, ChatResult};

/// A group needs this many selected participants besides the creator.
pub const MIN_GROUP_PARTICIPANTS: usize = 2;

pub struct ChatDirectory {
    session: Arc<SessionStore>,
}

impl ChatDirectory {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// All conversations visible to the signed-in identity.
    pub async fn list_chats(&self) -> ChatResult<Vec<Conversation>> {
        let token = self.session.require_token()?;
        Ok(self.session.api().list_chats(&token).await?)
    }

    /// Users currently reachable for starting a new conversation.
    pub async fn available_users(&self) -> ChatResult<Vec<Identity>> {
        let token = self.session.require_token()?;
        Ok(self.session.api().available_users(&token).await?)
    }

    /// Create a group chat. Name and participant count are validated here,
    /// before anything reaches the network.
    pub async fn create_group(
        &self,
        name: &str,
        participant_ids: &[String],
    ) -> ChatResult<Conversation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::MissingGroupName);
        }
        if participant_ids.len() < MIN_GROUP_PARTICIPANTS {
            return Err(ChatError::NotEnoughParticipants {
                selected: participant_ids.len(),
                required: MIN_GROUP_PARTICIPANTS,
            });
        }

        let token = self.session.require_token()?;
        let conversation = self
            .session
            .api()
            .create_group_chat(&token, name, participant_ids)
            .await?;
        info!(chat = %conversation.id, name, "group chat created");
        Ok(conversation)
    }

    pub async fn group_details(&self, chat_id: &str) -> ChatResult<Conversation> {
        let token = self.session.require_token()?;
        Ok(self.session.api().group_details(&token, chat_id).await?)
    }

    pub async fn rename_group(&self, chat_id: &str, name: &str) -> ChatResult<Conversation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::MissingGroupName);
        }
        let token = self.session.require_token()?;
        Ok(self.session.api().rename_group(&token, chat_id, name).await?)
    }

    pub async fn add_participant(
        &self,
        chat_id: &str,
        participant_id: &str,
    ) -> ChatResult<Conversation> {
        let token = self.session.require_token()?;
        Ok(self
            .session
            .api()
            .add_participant(&token, chat_id, participant_id)
            .await?)
    }

    pub async fn remove_participant(
        &self,
        chat_id: &str,
        participant_id: &str,
    ) -> ChatResult<Conversation> {
        let token = self.session.require_token()?;
        Ok(self
            .session
            .api()
            .remove_participant(&token, chat_id, participant_id)
            .await?)
    }
}
