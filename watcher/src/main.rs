use anyhow::{Context, Result};
use greenhouse_influx::InfluxClient;
use reqwest::Client as HTTPClient;
use tracing::error;

use crate::alerts::TelegramNotifier;
use crate::config::Config;
use crate::logging::{LogFormat, Logger};
use crate::monitor::Monitor;
mod alerts;
mod config;
mod logging;
mod monitor;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init(LogFormat::from_env());

    let config = Config::from_env().context("Invalid configuration")?;
    let http_client = HTTPClient::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let source = InfluxClient::new(http_client.clone(), config.influx.clone());
    let notifier = TelegramNotifier::new(http_client, config.telegram.clone());
    let monitor = Monitor::new(
        source,
        notifier,
        config.influx.field.clone(),
        config.threshold,
        config.poll_interval,
    );

    Logger::new()
        .field(&config.influx.field)
        .threshold(config.threshold)
        .info(
            "watcher.started",
            &format!(
                "Alert system active, polling {} every {}s",
                config.influx.bucket,
                config.poll_interval.as_secs()
            ),
        );

    monitor.run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
