use thiserror::Error;

/// Result type alias for Telegram delivery operations
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Errors that can occur when decoding an inbound notification
#[derive(Debug, Error)]
pub enum ParseError {
    /// Body is not a JSON object carrying the six string fields
    #[error("error unmarshaling request json: {0}")]
    Json(#[source] serde_json::Error),

    /// `_time` is not an RFC 3339 timestamp
    #[error("error parsing RFC 3339 time {value:?}")]
    InvalidTime {
        /// The rejected `_time` value
        value: String,
        /// Set when the layout matched but chrono rejected the value
        #[source]
        source: Option<chrono::ParseError>,
    },
}

/// Coarse classification of a failed delivery, used as the diagnostic tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The outbound request could not be assembled
    Construction,
    /// The request did not complete (network failure or cancellation)
    Transport,
    /// Telegram answered outside the success band
    RemoteRejected,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Construction => write!(f, "construction"),
            FailureReason::Transport => write!(f, "transport"),
            FailureReason::RemoteRejected => write!(f, "remote_rejected"),
        }
    }
}

/// Errors that can occur when sending a message to Telegram
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Failed to build HTTP client
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// API base URL cannot carry path segments
    #[error("Telegram API URL cannot be used as a base")]
    InvalidEndpoint,

    /// Failed to serialize the sendMessage body
    #[error("Failed to serialize telegram request json: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Failed to build the HTTP request
    #[error("Failed to build HTTP request: {0}")]
    BuildRequest(#[source] reqwest::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest_middleware::Error),

    /// The request was cancelled before a response arrived
    #[error("HTTP request cancelled")]
    Cancelled,

    /// Telegram Bot API returned a status outside [200, 400)
    #[error("Telegram API bad status: HTTP {status}")]
    Api {
        /// HTTP status code
        status: u16,
    },
}

impl DeliveryError {
    /// Classify the failure
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::BuildHttpClient(_)
            | Self::InvalidEndpoint
            | Self::Serialize(_)
            | Self::BuildRequest(_) => FailureReason::Construction,
            Self::Request(_) | Self::Cancelled => FailureReason::Transport,
            Self::Api { .. } => FailureReason::RemoteRejected,
        }
    }
}

/// Errors raised while loading configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty
    #[error("missing {0} env var")]
    MissingVar(&'static str),

    /// `TELEGRAM_API_URL` is not a valid URL
    #[error("invalid TELEGRAM_API_URL: {0}")]
    InvalidApiUrl(#[source] url::ParseError),

    /// `LISTEN_ADDR` is not a socket address
    #[error("invalid LISTEN_ADDR {value:?}: {source}")]
    InvalidListenAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}
