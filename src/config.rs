use crate::error::ConfigError;
use std::time::Duration;
use tracing::error;

pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";
pub const DEFAULT_RETRY_PERIOD_SECS: u64 = 600;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 0;

/// Status the process exits with when it cannot start: a plain exit, no reason given.
pub const STARTUP_EXIT_CODE: i32 = 0;

const REQUIRED_VARS: [&str; 3] = ["PRACTICUM_TOKEN", "TELEGRAM_TOKEN", "TELEGRAM_CHAT_ID"];

#[derive(Debug, Clone)]
pub struct Config {
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub endpoint: String,
    pub retry_period: Duration,
    /// `None` means requests to the review API never time out.
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Builds the configuration from an arbitrary variable source.
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let missing: Vec<&'static str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|name| get(*name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let retry_secs = parse_secs(&get, "RETRY_PERIOD", DEFAULT_RETRY_PERIOD_SECS)?;
        let timeout_secs = parse_secs(&get, "REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        Ok(Self {
            practicum_token: get("PRACTICUM_TOKEN").unwrap_or_default(),
            telegram_token: get("TELEGRAM_TOKEN").unwrap_or_default(),
            telegram_chat_id: get("TELEGRAM_CHAT_ID").unwrap_or_default(),
            endpoint: get("PRACTICUM_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            retry_period: Duration::from_secs(retry_secs),
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        })
    }
}

/// Loads the configuration or logs why it cannot, returning the exit status
/// the process must stop with. The poll loop is never entered on `Err`.
pub fn load_or_exit_code<F>(lookup: F) -> Result<Config, i32>
where
    F: Fn(&str) -> Option<String>,
{
    Config::from_lookup(lookup).map_err(|e| {
        error!("{}", e);
        STARTUP_EXIT_CODE
    })
}

fn parse_secs<G>(get: &G, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}
