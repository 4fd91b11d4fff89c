//! Process configuration read from the environment.

use std::net::SocketAddr;

use url::Url;

use crate::errors::ConfigError;

const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";
const API_URL_VAR: &str = "TELEGRAM_API_URL";
const LISTEN_ADDR_VAR: &str = "LISTEN_ADDR";

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Wrapper for secrets that never appears in logs
///
/// `Debug` and `Display` always print `[REDACTED]`.
///
/// ```
/// use influx_telegram_proxy::SecretString;
///
/// let secret = SecretString::new("123456:ABC-DEF".to_string());
/// assert_eq!(format!("{:?}", secret), "[REDACTED]");
/// assert_eq!(secret.expose(), "123456:ABC-DEF");
/// ```
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        SecretString(s)
    }

    /// Exposes the underlying secret value. Never pass the result to a logger.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: SecretString,
    pub chat_id: String,
    pub api_url: Url,
    pub listen_addr: SocketAddr,
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if `TELEGRAM_BOT_TOKEN` or `TELEGRAM_CHAT_ID` is unset
    /// or empty, or if an optional variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let bot_token = SecretString::new(required(BOT_TOKEN_VAR)?);
        let chat_id = required(CHAT_ID_VAR)?;

        let api_url = lookup(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_url).map_err(ConfigError::InvalidApiUrl)?;

        let listen_addr =
            lookup(LISTEN_ADDR_VAR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|source| ConfigError::InvalidListenAddr {
                value: listen_addr.clone(),
                source,
            })?;

        Ok(Self {
            bot_token,
            chat_id,
            api_url,
            listen_addr,
        })
    }
}
