use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "parley.toml",
    "config/parley.toml",
    "crates/config/parley.toml",
    "../parley.toml",
    "../config/parley.toml",
    "../crates/config/parley.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub polling: PollingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}

/// Connection settings for the remote chat backend.
///
/// ```
/// use parley_config::ApiConfig;
///
/// let api = ApiConfig::default();
/// assert_eq!(api.base_url, "https://api.freeapi.app/api/v1");
/// assert_eq!(api.request_timeout_seconds, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "ApiConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ApiConfig {
    fn default_base_url() -> String {
        "https://api.freeapi.app/api/v1".to_string()
    }

    const fn default_request_timeout() -> u64 {
        30
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the signed-in identity and tokens are cached between runs.
    #[serde(default = "SessionConfig::default_cache_path")]
    pub cache_path: PathBuf,
}

impl SessionConfig {
    fn default_cache_path() -> PathBuf {
        PathBuf::from("parley-session.json")
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_path: Self::default_cache_path(),
        }
    }
}

/// Message refresh cadence for open conversations.
///
/// Direct and group conversations historically refreshed at different rates;
/// both are kept configurable rather than unified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "PollingConfig::default_direct_interval")]
    pub direct_interval_seconds: u64,
    #[serde(default = "PollingConfig::default_group_interval")]
    pub group_interval_seconds: u64,
}

impl PollingConfig {
    pub fn direct_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.direct_interval_seconds)
    }

    pub fn group_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.group_interval_seconds)
    }

    /// The refresh cadence for a conversation of the given kind.
    pub fn interval_for(&self, is_group: bool) -> std::time::Duration {
        if is_group {
            self.group_interval()
        } else {
            self.direct_interval()
        }
    }

    const fn default_direct_interval() -> u64 {
        2
    }

    const fn default_group_interval() -> u64 {
        8
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            direct_interval_seconds: Self::default_direct_interval(),
            group_interval_seconds: Self::default_group_interval(),
        }
    }
}

/// Load the client configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use parley_config::load;
///
/// std::env::remove_var("PARLEY_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.api.base_url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("api.base_url", defaults.api.base_url.clone())
        .unwrap()
        .set_default(
            "api.request_timeout_seconds",
            i64::try_from(defaults.api.request_timeout_seconds).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default(
            "session.cache_path",
            defaults.session.cache_path.display().to_string(),
        )
        .unwrap()
        .set_default(
            "polling.direct_interval_seconds",
            i64::try_from(defaults.polling.direct_interval_seconds).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default(
            "polling.group_interval_seconds",
            i64::try_from(defaults.polling.group_interval_seconds).unwrap_or(i64::MAX),
        )
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("PARLEY").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("PARLEY_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via PARLEY_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded client configuration");
    Ok(config)
}
