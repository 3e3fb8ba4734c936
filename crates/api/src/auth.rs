//! Account endpoints: register, login, token refresh.

use serde::Serialize;
use tracing::debug;

use crate::envelope::decode;
use crate::types::{Identity, LoginData, NewAccount, RefreshData};
use crate::{ApiClient, ApiError};

#[derive(Serialize)]
struct RegisterPayload<'a> {
    email: &'a str,
    password: &'a str,
    username: &'a str,
    role: &'static str,
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshPayload<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(serde::Deserialize)]
struct RegisterData {
    user: Identity,
}

impl ApiClient {
    /// Create an account. The backend does not issue tokens here; callers
    /// log in separately.
    pub async fn register(&self, account: &NewAccount) -> Result<Identity, ApiError> {
        debug!(username = %account.username, "registering account");

        let response = self
            .http()
            .post(self.endpoint("/users/register"))
            .json(&RegisterPayload {
                email: &account.email,
                password: &account.password,
                username: &account.username,
                role: "USER",
            })
            .send()
            .await?;

        let data: RegisterData = decode(response).await?;
        Ok(data.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginData, ApiError> {
        debug!(email, "logging in");

        let response = self
            .http()
            .post(self.endpoint("/users/login"))
            .json(&LoginPayload { email, password })
            .send()
            .await?;

        decode(response).await
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshData, ApiError> {
        debug!("refreshing access token");

        let response = self
            .http()
            .post(self.endpoint("/users/refresh-token"))
            .json(&RefreshPayload { refresh_token })
            .send()
            .await?;

        decode(response).await
    }
}
