use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_DIALOGUE_DB: &str = "db.sqlite";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got `{value}`")]
    InvalidSeconds { var: &'static str, value: String },
}

/// Settings read from the environment (and `.env`, when present).
/// The bot token itself is picked up by `Bot::from_env`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dialogue_db: PathBuf,
    /// Idle time after which an unfinished quiz session is dropped.
    pub session_ttl: Option<Duration>,
    pub catalog_path: Option<PathBuf>,
    pub strings_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let session_ttl = match non_empty("SESSION_TTL_SECS") {
            Some(value) => {
                let secs = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidSeconds {
                        var: "SESSION_TTL_SECS",
                        value,
                    })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            dialogue_db: non_empty("DIALOGUE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DIALOGUE_DB)),
            session_ttl,
            catalog_path: non_empty("QUIZ_CATALOG_PATH").map(PathBuf::from),
            strings_path: non_empty("UI_STRINGS_PATH").map(PathBuf::from),
        })
    }
}
