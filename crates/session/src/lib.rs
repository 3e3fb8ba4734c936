//! The session store: the one place that owns the authenticated identity and
//! its tokens.
//!
//! Everything else in the client reads identity and token through a shared
//! handle to this store. State survives restarts via a JSON cache file; a
//! missing or corrupt file simply means unauthenticated.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use parley_api::{ApiClient, ApiError, Identity, NewAccount};
use parley_config::SessionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not signed in")]
    NotAuthenticated,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session cache error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("session cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionSnapshot {
    user: Identity,
    access_token: String,
    refresh_token: String,
}

pub struct SessionStore {
    api: ApiClient,
    cache_path: PathBuf,
    state: RwLock<Option<SessionSnapshot>>,
}

impl SessionStore {
    pub fn new(api: ApiClient, config: &SessionConfig) -> Self {
        Self::with_cache_path(api, config.cache_path.clone())
    }

    pub fn with_cache_path(api: ApiClient, cache_path: PathBuf) -> Self {
        let restored = restore(&cache_path);
        if let Some(snapshot) = &restored {
            debug!(user = %snapshot.user.username, "restored session from cache");
        }
        Self {
            api,
            cache_path,
            state: RwLock::new(restored),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read_state().as_ref().map(|snapshot| snapshot.user.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_state()
            .as_ref()
            .map(|snapshot| snapshot.access_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_some()
    }

    /// The bearer token, or the error every authenticated operation maps to
    /// when no one is signed in.
    pub fn require_token(&self) -> Result<String, SessionError> {
        self.access_token().ok_or(SessionError::NotAuthenticated)
    }

    /// Exchange credentials for a session and persist it.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let data = self.api.login(email, password).await?;
        let snapshot = SessionSnapshot {
            user: data.user.clone(),
            access_token: data.access_token,
            refresh_token: data.refresh_token,
        };
        self.install(snapshot)?;
        info!(user = %data.user.username, "signed in");
        Ok(data.user)
    }

    /// Create an account. Deliberately does not establish a session; the
    /// caller logs in explicitly afterwards.
    pub async fn register(&self, account: &NewAccount) -> Result<Identity, SessionError> {
        let user = self.api.register(account).await?;
        info!(user = %user.username, "account registered");
        Ok(user)
    }

    /// Drop identity, tokens, and the cache file. Always leaves the store
    /// unauthenticated, even if the cache file could not be removed.
    pub fn logout(&self) {
        let had_session = self.write_state().take().is_some();

        if let Err(error) = std::fs::remove_file(&self.cache_path) {
            if error.kind() != ErrorKind::NotFound {
                warn!(?error, path = %self.cache_path.display(), "failed to remove session cache");
            }
        }

        if had_session {
            info!("signed out");
        }
    }

    /// Trade the refresh token for a new access token. Any failure clears
    /// all local session state, forcing a fresh login.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let refresh_token = self
            .read_state()
            .as_ref()
            .map(|snapshot| snapshot.refresh_token.clone())
            .ok_or(SessionError::NotAuthenticated)?;

        match self.api.refresh_token(&refresh_token).await {
            Ok(data) => {
                let updated = {
                    let mut guard = self.write_state();
                    let Some(snapshot) = guard.as_mut() else {
                        return Err(SessionError::NotAuthenticated);
                    };
                    snapshot.access_token = data.access_token;
                    if let Some(rotated) = data.refresh_token {
                        snapshot.refresh_token = rotated;
                    }
                    snapshot.clone()
                };
                self.persist(&updated)?;
                debug!("access token refreshed");
                Ok(())
            }
            Err(error) => {
                warn!(%error, "token refresh failed, clearing session");
                self.logout();
                Err(SessionError::Api(error))
            }
        }
    }

    fn install(&self, snapshot: SessionSnapshot) -> Result<(), SessionError> {
        self.persist(&snapshot)?;
        *self.write_state() = Some(snapshot);
        Ok(())
    }

    fn persist(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(snapshot)?;
        std::fs::write(&self.cache_path, json)?;
        Ok(())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Option<SessionSnapshot>> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Option<SessionSnapshot>> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn restore(path: &Path) -> Option<SessionSnapshot> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) => {
            if error.kind() != ErrorKind::NotFound {
                warn!(?error, path = %path.display(), "failed to read session cache");
            }
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(snapshot) => Some(snapshot),
        Err(error) => {
            warn!(%error, path = %path.display(), "discarding corrupt session cache");
            None
        }
    }
}
