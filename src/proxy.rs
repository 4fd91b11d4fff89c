//! Inbound webhook endpoint.
//!
//! `POST /` takes an InfluxDB check notification, relays it to Telegram and
//! answers with one of three JSON outcomes:
//!
//! | Outcome | Status | Body |
//! |---|---|---|
//! | body does not parse | 400 | `{"error":"request parse error"}` |
//! | Telegram delivery fails | 500 | `{"error":"telegram send error"}` |
//! | delivered | 200 | `{"message":"sent to telegram"}` |

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::client::TelegramClient;
use crate::format::FormattedMessage;
use crate::types::Notification;

const PARSE_ERROR: &str = "request parse error";
const SEND_ERROR: &str = "telegram send error";
const SENT: &str = "sent to telegram";

/// Collaborators shared by every request
#[derive(Debug, Clone)]
pub struct AppState {
    telegram: TelegramClient,
    shutdown: CancellationToken,
}

impl AppState {
    /// `shutdown` cancels every in-flight delivery when it fires
    pub fn new(telegram: TelegramClient, shutdown: CancellationToken) -> Self {
        Self { telegram, shutdown }
    }
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

#[derive(Serialize)]
struct SuccessResponse<'a> {
    message: &'a str,
}

/// Build the proxy router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(relay_notification))
        .with_state(state)
}

/// Serve the proxy on `listener` until the state's shutdown token fires
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn relay_notification(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    // Oversized or unreadable bodies get the same answer as undecodable ones
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "error reading request body");
            return json_response(StatusCode::BAD_REQUEST, &ErrorResponse { error: PARSE_ERROR });
        }
    };

    let notification = match Notification::from_slice(&body) {
        Ok(notification) => notification,
        Err(e) => {
            error!(error = %e, "error parsing notification");
            return json_response(StatusCode::BAD_REQUEST, &ErrorResponse { error: PARSE_ERROR });
        }
    };

    info!(?notification, "received notification");

    let message = FormattedMessage::from_notification(&notification);

    // A client disconnect drops this future and the outbound call with it.
    let cancel = state.shutdown.child_token();
    if let Err(e) = state.telegram.send_message(&message, &cancel).await {
        info!(reason = %e.reason(), error = %e, "telegram send error");
        return json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &ErrorResponse { error: SEND_ERROR },
        );
    }

    json_response(StatusCode::OK, &SuccessResponse { message: SENT })
}

/// Status and content type are fixed before the body is encoded; an encoding
/// failure leaves the body empty.
fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let body = serde_json::to_vec(body).unwrap_or_else(|e| {
        error!(error = %e, "error writing json response");
        Vec::new()
    });

    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
