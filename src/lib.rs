//! # InfluxDB Telegram Proxy
//!
//! Relays [InfluxDB](https://docs.influxdata.com/influxdb/v2/monitor-alert/) check
//! notifications to a Telegram chat through the
//! [Bot API](https://core.telegram.org/bots/api).
//!
//! ## Features
//!
//! - `POST /` webhook accepting the InfluxDB HTTP notification endpoint payload
//! - Strict RFC 3339 validation of the notification time
//! - MarkdownV2 rendering that escapes every reserved character
//! - One delivery attempt per notification, cancelled with the inbound request
//!
//! ## Example
//!
//! ```rust,no_run
//! use influx_telegram_proxy::{proxy, AppState, Config, TelegramClient};
//! use tokio::net::TcpListener;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let telegram = TelegramClient::new(config.api_url, config.bot_token, config.chat_id)?;
//!
//!     let listener = TcpListener::bind(config.listen_addr).await?;
//!     proxy::serve(listener, AppState::new(telegram, CancellationToken::new())).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod errors;
mod format;
pub mod proxy;
mod types;

pub use client::TelegramClient;
pub use config::{Config, SecretString};
pub use errors::{ConfigError, DeliveryError, FailureReason, ParseError, Result};
pub use format::{markdown_bold, markdown_safe, FormattedMessage, ParseMode};
pub use proxy::AppState;
pub use types::{Notification, NotificationPayload};
