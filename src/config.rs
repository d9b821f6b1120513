//! Process configuration handed to the container by Galaxy.
//!
//! Galaxy starts an Interactive Environment with a handful of environment
//! variables describing where it lives and which history the user is working
//! in. They are read once into [`GalaxyConfig`] and passed around explicitly.

use std::path::PathBuf;

use thiserror::Error;

/// Directory downloads are materialized under inside the container.
pub const DEFAULT_IMPORT_DIR: &str = "/import";

pub const ENV_HISTORY_ID: &str = "HISTORY_ID";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_GALAXY_URL: &str = "GALAXY_URL";
pub const ENV_GALAXY_WEB_PORT: &str = "GALAXY_WEB_PORT";
pub const ENV_DEBUG: &str = "DEBUG";
pub const ENV_INFO: &str = "INFO";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
}

/// Verbosity requested through the `DEBUG` / `INFO` toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Quiet,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Quiet => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GalaxyConfig {
    /// History the IE was launched from.
    pub history_id: Option<String>,
    pub api_key: String,
    /// Galaxy URL as seen by the user; may contain `$DOCKER_HOST`.
    pub galaxy_url: String,
    pub web_port: Option<String>,
    pub import_dir: PathBuf,
    pub log: LogLevel,
}

impl GalaxyConfig {
    /// Load from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Load using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            history_id: non_empty(ENV_HISTORY_ID),
            api_key: non_empty(ENV_API_KEY).ok_or(ConfigError::Missing(ENV_API_KEY))?,
            galaxy_url: non_empty(ENV_GALAXY_URL).ok_or(ConfigError::Missing(ENV_GALAXY_URL))?,
            web_port: non_empty(ENV_GALAXY_WEB_PORT),
            import_dir: PathBuf::from(DEFAULT_IMPORT_DIR),
            log: log_level(&lookup),
        })
    }

    /// Pick the explicit history id if given, else the one Galaxy launched us with.
    pub fn history_id(&self, explicit: Option<&str>) -> Result<String, ConfigError> {
        explicit
            .map(str::to_string)
            .or_else(|| self.history_id.clone())
            .ok_or(ConfigError::Missing(ENV_HISTORY_ID))
    }
}

/// `DEBUG=true` wins over `INFO=true`; anything else stays quiet.
pub fn log_level<F>(lookup: F) -> LogLevel
where
    F: Fn(&str) -> Option<String>,
{
    let enabled = |key: &str| lookup(key).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    if enabled(ENV_DEBUG) {
        LogLevel::Debug
    } else if enabled(ENV_INFO) {
        LogLevel::Info
    } else {
        LogLevel::Quiet
    }
}
