use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};
use url::Url;

use crate::config::SecretString;
use crate::errors::{DeliveryError, Result};
use crate::format::{FormattedMessage, ParseMode};

/// Body of a Bot API `sendMessage` call
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: ParseMode,
}

/// Client for sending messages through the Telegram Bot API
///
/// Cloning is cheap and clones share the connection pool, so one instance
/// serves every request handler.
///
/// # Example
///
/// ```rust,no_run
/// use influx_telegram_proxy::{FormattedMessage, ParseMode, SecretString, TelegramClient};
/// use tokio_util::sync::CancellationToken;
/// use url::Url;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = TelegramClient::new(
///         Url::parse("https://api.telegram.org")?,
///         SecretString::new("123456:ABC-DEF".to_string()),
///         "-1001234567890".to_string(),
///     )?;
///
///     let message = FormattedMessage {
///         text: "\\h\\e\\l\\l\\o".to_string(),
///         parse_mode: ParseMode::MarkdownV2,
///     };
///
///     client.send_message(&message, &CancellationToken::new()).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct TelegramClient {
    client: ClientWithMiddleware,
    api_url: Url,
    bot_token: SecretString,
    chat_id: String,
}

impl TelegramClient {
    /// Create a new Telegram client
    ///
    /// No request timeout is set: a send lasts as long as the cancellation
    /// token passed to [`send_message`](Self::send_message) allows.
    ///
    /// # Arguments
    ///
    /// * `api_url` - Base URL of the Bot API (e.g., `https://api.telegram.org`)
    /// * `bot_token` - Bot token issued by BotFather
    /// * `chat_id` - Chat that receives every message
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_url: Url, bot_token: SecretString, chat_id: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(DeliveryError::BuildHttpClient)?;

        let client = ClientBuilder::new(client).build();

        Ok(Self::with_client(client, api_url, bot_token, chat_id))
    }

    /// Create a new client with a custom reqwest middleware client
    pub fn with_client(
        client: ClientWithMiddleware,
        api_url: Url,
        bot_token: SecretString,
        chat_id: String,
    ) -> Self {
        Self {
            client,
            api_url,
            bot_token,
            chat_id,
        }
    }

    /// `<api_url>/bot<token>/sendMessage`
    fn send_message_url(&self) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| DeliveryError::InvalidEndpoint)?
            .pop_if_empty()
            .push(&format!("bot{}", self.bot_token.expose()))
            .push("sendMessage");
        Ok(url)
    }

    /// Send one message to the configured chat
    ///
    /// Makes exactly one attempt. If `cancel` fires first the in-flight
    /// request is dropped and [`DeliveryError::Cancelled`] is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request cannot be built
    /// - The HTTP request fails or is cancelled
    /// - Telegram returns a status outside [200, 400)
    #[instrument(
        name = "TelegramClient::send_message",
        skip_all,
        fields(text_len = message.text.len(), parse_mode = message.parse_mode.as_str())
    )]
    pub async fn send_message(
        &self,
        message: &FormattedMessage,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let result = self.try_send_message(message, cancel).await;
        if let Err(err) = &result {
            error!(reason = %err.reason(), error = %err, "Telegram delivery failed");
        }
        result
    }

    async fn try_send_message(
        &self,
        message: &FormattedMessage,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = self.send_message_url()?;

        let body = serde_json::to_vec(&SendMessageRequest {
            chat_id: &self.chat_id,
            text: &message.text,
            parse_mode: message.parse_mode,
        })
        .map_err(DeliveryError::Serialize)?;

        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()
            .map_err(|e| DeliveryError::BuildRequest(e.without_url()))?;

        debug!("Sending message to Telegram");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DeliveryError::Cancelled),
            response = self.client.execute(request) => response.map_err(redact)?,
        };

        let status = response.status();

        if !in_success_band(status) {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                body = response.json::<serde_json::Value>() => match body {
                    Ok(body) => Some(body),
                    Err(e) => {
                        error!(status_code = status.as_u16(), error = %e.without_url(), "error decoding bad response body");
                        None
                    }
                },
            };
            error!(
                status_code = status.as_u16(),
                body = ?body,
                "bad telegram bot api status code"
            );
            return Err(DeliveryError::Api {
                status: status.as_u16(),
            });
        }

        debug!(status_code = status.as_u16(), "Message sent successfully");
        Ok(())
    }

    /// Get the base API URL
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Get the target chat identifier
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .field("bot_token", &self.bot_token)
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Statuses Telegram is considered to have accepted
fn in_success_band(status: StatusCode) -> bool {
    (200..400).contains(&status.as_u16())
}

/// The request URL carries the bot token, so it never reaches an error message
fn redact(err: reqwest_middleware::Error) -> DeliveryError {
    match err {
        reqwest_middleware::Error::Reqwest(e) => {
            DeliveryError::Request(reqwest_middleware::Error::Reqwest(e.without_url()))
        }
        other => DeliveryError::Request(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureReason;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123456:ABC-DEF";
    const SEND_PATH: &str = "/bot123456:ABC-DEF/sendMessage";

    fn test_client(uri: &str) -> TelegramClient {
        TelegramClient::new(
            Url::parse(uri).unwrap(),
            SecretString::new(TOKEN.to_string()),
            "-100200".to_string(),
        )
        .unwrap()
    }

    fn test_message() -> FormattedMessage {
        FormattedMessage {
            text: "*\\O\\K* on \\d\\i\\s\\k".to_string(),
            parse_mode: ParseMode::MarkdownV2,
        }
    }

    #[tokio::test]
    async fn test_send_message_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "chat_id": "-100200",
                "text": "*\\O\\K* on \\d\\i\\s\\k",
                "parse_mode": "MarkdownV2"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());

        let result = client
            .send_message(&test_message(), &CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_message_keeps_base_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/telegram{SEND_PATH}")))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&format!("{}/telegram/", mock_server.uri()));

        let result = client
            .send_message(&test_message(), &CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_message_no_content_is_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());

        let result = client
            .send_message(&test_message(), &CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_message_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: can't parse entities"
            })))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());

        let result = client
            .send_message(&test_message(), &CancellationToken::new())
            .await;

        match result {
            Err(err @ DeliveryError::Api { status: 400 }) => {
                assert_eq!(err.reason(), FailureReason::RemoteRejected);
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_message_server_error_with_undecodable_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());

        let result = client
            .send_message(&test_message(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(DeliveryError::Api { status: 503 })));
    }

    #[tokio::test]
    async fn test_send_message_transport_error_hides_token() {
        // Nothing listens on port 1
        let client = test_client("http://127.0.0.1:1");

        let err = client
            .send_message(&test_message(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Request(_)));
        assert_eq!(err.reason(), FailureReason::Transport);
        assert!(!format!("{err} {err:?}").contains(TOKEN));
    }

    #[tokio::test]
    async fn test_send_message_cancelled() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let err = client
            .send_message(&test_message(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Cancelled));
        assert_eq!(err.reason(), FailureReason::Transport);
    }

    #[tokio::test]
    async fn test_send_message_already_cancelled_makes_no_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.send_message(&test_message(), &cancel).await;
        assert!(matches!(result, Err(DeliveryError::Cancelled)));
    }

    #[tokio::test]
    async fn test_send_message_invalid_endpoint() {
        let client = test_client("mailto:ops@example.com");

        let err = client
            .send_message(&test_message(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::InvalidEndpoint));
        assert_eq!(err.reason(), FailureReason::Construction);
    }

    #[test]
    fn test_success_band() {
        for code in [200, 201, 204, 301, 304, 399] {
            assert!(in_success_band(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [100, 101, 199, 400, 404, 429, 500, 503] {
            assert!(!in_success_band(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn test_send_message_url() {
        let client = test_client("https://api.telegram.org");
        assert_eq!(
            client.send_message_url().unwrap().as_str(),
            "https://api.telegram.org/bot123456:ABC-DEF/sendMessage"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = test_client("https://api.telegram.org");
        let debug = format!("{client:?}");
        assert!(!debug.contains(TOKEN));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_getters() {
        let url = Url::parse("https://api.telegram.org").unwrap();
        let client = test_client(url.as_str());
        assert_eq!(client.api_url(), &url);
        assert_eq!(client.chat_id(), "-100200");
    }
}
