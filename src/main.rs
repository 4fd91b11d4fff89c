//! influx-telegram-proxy
//!
//! Listens for InfluxDB check notifications and forwards them to Telegram.

use influx_telegram_proxy::{proxy, AppState, Config, TelegramClient};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().unwrap_or_else(|err| {
        error!(error = %err, "error parsing environment");
        std::process::exit(1);
    });

    let telegram = TelegramClient::new(config.api_url, config.bot_token, config.chat_id)?;

    info!(
        api_url = %telegram.api_url(),
        chat_id = %telegram.chat_id(),
        listen_addr = %config.listen_addr,
        "Starting influx-telegram-proxy"
    );

    let shutdown = CancellationToken::new();

    let listener = TcpListener::bind(config.listen_addr).await?;

    let shutdown_on_signal = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("start graceful shutdown");
        shutdown_on_signal.cancel();
    });

    if let Err(err) = proxy::serve(listener, AppState::new(telegram, shutdown)).await {
        error!(error = %err, "error running http server");
        return Err(err.into());
    }

    info!("exiting");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
