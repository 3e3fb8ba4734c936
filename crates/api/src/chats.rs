//! Conversation endpoints: listing, direct chat resolution, group management.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::envelope::decode;
use crate::types::{Conversation, Identity};
use crate::{ApiClient, ApiError};

#[derive(Serialize)]
struct CreateGroupPayload<'a> {
    name: &'a str,
    participants: &'a [String],
}

#[derive(Serialize)]
struct RenameGroupPayload<'a> {
    name: &'a str,
}

impl ApiClient {
    /// Users currently reachable for starting a new conversation.
    pub async fn available_users(&self, token: &str) -> Result<Vec<Identity>, ApiError> {
        let response = self
            .http()
            .get(self.endpoint("/chat-app/chats/users"))
            .bearer_auth(token)
            .send()
            .await?;

        decode(response).await
    }

    /// All conversations visible to the current identity.
    pub async fn list_chats(&self, token: &str) -> Result<Vec<Conversation>, ApiError> {
        let response = self
            .http()
            .get(self.endpoint("/chat-app/chats"))
            .bearer_auth(token)
            .send()
            .await?;

        decode(response).await
    }

    /// Resolve or create the one-on-one conversation with `receiver_id`.
    pub async fn create_direct_chat(
        &self,
        token: &str,
        receiver_id: &str,
    ) -> Result<Conversation, ApiError> {
        debug!(receiver_id, "resolving direct chat");

        let response = self
            .http()
            .post(self.endpoint(&format!("/chat-app/chats/c/{receiver_id}")))
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;

        decode(response).await
    }

    pub async fn create_group_chat(
        &self,
        token: &str,
        name: &str,
        participants: &[String],
    ) -> Result<Conversation, ApiError> {
        debug!(name, count = participants.len(), "creating group chat");

        let response = self
            .http()
            .post(self.endpoint("/chat-app/chats/group"))
            .bearer_auth(token)
            .json(&CreateGroupPayload { name, participants })
            .send()
            .await?;

        decode(response).await
    }

    pub async fn group_details(
        &self,
        token: &str,
        chat_id: &str,
    ) -> Result<Conversation, ApiError> {
        let response = self
            .http()
            .get(self.endpoint(&format!("/chat-app/chats/group/{chat_id}")))
            .bearer_auth(token)
            .send()
            .await?;

        decode(response).await
    }

    pub async fn rename_group(
        &self,
        token: &str,
        chat_id: &str,
        name: &str,
    ) -> Result<Conversation, ApiError> {
        debug!(chat_id, name, "renaming group");

        let response = self
            .http()
            .patch(self.endpoint(&format!("/chat-app/chats/group/{chat_id}")))
            .bearer_auth(token)
            .json(&RenameGroupPayload { name })
            .send()
            .await?;

        decode(response).await
    }

    pub async fn add_participant(
        &self,
        token: &str,
        chat_id: &str,
        participant_id: &str,
    ) -> Result<Conversation, ApiError> {
        debug!(chat_id, participant_id, "adding participant");

        let response = self
            .http()
            .post(self.endpoint(&format!("/chat-app/chats/group/{chat_id}/{participant_id}")))
            .bearer_auth(token)
            .send()
            .await?;

        decode(response).await
    }

    pub async fn remove_participant(
        &self,
        token: &str,
        chat_id: &str,
        participant_id: &str,
    ) -> Result<Conversation, ApiError> {
        debug!(chat_id, participant_id, "removing participant");

        let response = self
            .http()
            .delete(self.endpoint(&format!("/chat-app/chats/group/{chat_id}/{participant_id}")))
            .bearer_auth(token)
            .send()
            .await?;

        decode(response).await
    }
}
