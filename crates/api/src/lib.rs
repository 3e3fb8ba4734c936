//! Typed HTTP client for the chat backend REST API.
//!
//! Every endpoint wrapper decodes the backend's response envelope at the
//! boundary and returns plain typed payloads; callers never see raw JSON.

use std::time::Duration;

use parley_config::ApiConfig;
use url::Url;

mod auth;
mod chats;
mod envelope;
mod error;
mod messages;
mod types;

pub use envelope::ApiEnvelope;
pub use error::ApiError;
pub use messages::MAX_ATTACHMENTS;
pub use types::{
    Attachment, Conversation, Identity, LoginData, Message, NewAccount, OutgoingAttachment,
    RefreshData,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        // Fail early on a malformed base url instead of at the first request.
        Url::parse(&config.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Absolute endpoint url for a path starting with `/`.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            request_timeout_seconds: 5,
        }
    }

    #[test]
    fn endpoint_joins_without_duplicate_slashes() {
        let client = ApiClient::new(&config("http://localhost:3000/api/v1/")).expect("client");
        assert_eq!(
            client.endpoint("/chat-app/chats"),
            "http://localhost:3000/api/v1/chat-app/chats"
        );
    }

    #[test]
    fn malformed_base_url_is_rejected_at_construction() {
        let error = ApiClient::new(&config("not a url")).expect_err("should reject");
        assert!(matches!(error, ApiError::BaseUrl(_)));
    }
}
