//! Runtime configuration resolved from the environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::gateway::DEFAULT_BASE_URL;
use crate::store::DEFAULT_STORE_FILE;

/// Credential for the chat-completion provider.
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";
/// Override for the provider base URL.
pub const BASE_URL_VAR: &str = "OPENROUTER_BASE_URL";
/// Location of the research store.
pub const STORE_VAR: &str = "STORYLINE_STORE";
/// Per-call LLM timeout in whole seconds.
pub const TIMEOUT_VAR: &str = "STORYLINE_LLM_TIMEOUT_SECS";

/// Default LLM timeout. Deep research can take many minutes.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(1200);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("OPENROUTER_API_KEY is not set. Add it to your environment or a .env file.")]
    MissingApiKey,

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Fully resolved settings.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub store_path: PathBuf,
    pub llm_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("store_path", &self.store_path)
            .field("llm_timeout", &self.llm_timeout)
            .finish()
    }
}

impl Config {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::MissingApiKey)?;
        let base_url = get(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let store_path = get(STORE_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE));

        let llm_timeout = match get(TIMEOUT_VAR) {
            None => DEFAULT_LLM_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: TIMEOUT_VAR,
                        value: raw,
                        reason: "expected a positive number of seconds",
                    });
                }
            },
        };

        Ok(Self {
            api_key,
            base_url,
            store_path,
            llm_timeout,
        })
    }

    /// Replace the store location, e.g. from a command-line flag.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }
}
