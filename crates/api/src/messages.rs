//! Message endpoints: history, multipart send, deletion.

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use crate::envelope::decode;
use crate::types::{Message, OutgoingAttachment};
use crate::{ApiClient, ApiError};

/// The backend accepts at most this many attachments per message.
pub const MAX_ATTACHMENTS: usize = 5;

impl ApiClient {
    /// Full message history of a conversation, oldest first.
    pub async fn list_messages(&self, token: &str, chat_id: &str) -> Result<Vec<Message>, ApiError> {
        let response = self
            .http()
            .get(self.endpoint(&format!("/chat-app/messages/{chat_id}")))
            .bearer_auth(token)
            .send()
            .await?;

        decode(response).await
    }

    /// Submit a message with optional attachments. The attachment cap is
    /// enforced here, before any request goes out.
    pub async fn send_message(
        &self,
        token: &str,
        chat_id: &str,
        content: &str,
        attachments: Vec<OutgoingAttachment>,
    ) -> Result<Message, ApiError> {
        if attachments.len() > MAX_ATTACHMENTS {
            return Err(ApiError::TooManyAttachments {
                count: attachments.len(),
                limit: MAX_ATTACHMENTS,
            });
        }

        debug!(chat_id, attachments = attachments.len(), "sending message");

        let mut form = Form::new().text("content", content.to_string());
        for attachment in attachments {
            let part = Part::bytes(attachment.bytes).file_name(attachment.file_name);
            form = form.part("attachments", part);
        }

        let response = self
            .http()
            .post(self.endpoint(&format!("/chat-app/messages/{chat_id}")))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        decode(response).await
    }

    /// Delete a message. The payload echoes the deleted message; callers
    /// refetch the history anyway, so it is discarded here.
    pub async fn delete_message(
        &self,
        token: &str,
        chat_id: &str,
        message_id: &str,
    ) -> Result<(), ApiError> {
        debug!(chat_id, message_id, "deleting message");

        let response = self
            .http()
            .delete(self.endpoint(&format!("/chat-app/messages/{chat_id}/{message_id}")))
            .bearer_auth(token)
            .send()
            .await?;

        decode::<Value>(response).await.map(|_| ())
    }
}
