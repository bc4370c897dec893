use std::time::Duration;

use crate::error::ConfigError;
use crate::quiz::router::DEFAULT_ID_ATTEMPTS;

const DEFAULT_BROADCAST_MESSAGE: &str =
    "Still wondering how well your friends know you? Create a quiz and send them the link!";

/// Runtime settings, read from the environment after `.env` is loaded.
///
/// The bot token itself is picked up by `Bot::from_env` (`TELOXIDE_TOKEN`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    /// Overrides the username reported by `getMe` when building links.
    pub bot_username: Option<String>,
    pub store_timeout: Duration,
    /// `None` turns the broadcast off.
    pub broadcast_interval: Option<Duration>,
    pub broadcast_message: String,
    pub broadcast_concurrency: usize,
    pub id_attempts: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(key) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::NotANumber { key, value }),
            }
        };
        let positive = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match number(key, default)? {
                0 => Err(ConfigError::Zero { key }),
                n => Ok(n),
            }
        };

        let broadcast_secs = number("BROADCAST_INTERVAL_SECS", 3600)?;

        Ok(Self {
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "friendship.db".to_string()),
            bot_username: get("BOT_USERNAME").filter(|name| !name.trim().is_empty()),
            store_timeout: Duration::from_secs(positive("STORE_TIMEOUT_SECS", 5)?),
            broadcast_interval: (broadcast_secs > 0).then(|| Duration::from_secs(broadcast_secs)),
            broadcast_message: get("BROADCAST_MESSAGE")
                .unwrap_or_else(|| DEFAULT_BROADCAST_MESSAGE.to_string()),
            broadcast_concurrency: positive("BROADCAST_CONCURRENCY", 8)? as usize,
            id_attempts: positive("ID_ATTEMPTS", DEFAULT_ID_ATTEMPTS as u64)? as usize,
        })
    }
}
