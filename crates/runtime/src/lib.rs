use std::sync::Arc;

use anyhow::{Context, Result};
use parley_api::ApiClient;
use parley_config::AppConfig;
use parley_session::SessionStore;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the application root constructs once and hands to the views:
/// the API client and the session store built on top of it.
#[derive(Clone)]
pub struct ClientServices {
    pub api: ApiClient,
    pub session: Arc<SessionStore>,
}

impl ClientServices {
    pub fn initialise(config: &AppConfig) -> Result<Self> {
        let api = ApiClient::new(&config.api).context("failed to construct api client")?;
        let session = Arc::new(SessionStore::new(api.clone(), &config.session));

        if let Some(identity) = session.identity() {
            info!(user = %identity.username, "session restored");
        } else {
            info!("no stored session, starting unauthenticated");
        }

        Ok(Self { api, session })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
