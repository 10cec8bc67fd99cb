use reqwest::{Client as HTTPClient, StatusCode};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramSettings {
    pub api_url: String,
    pub token: String,
    pub chat_id: String,
}

impl fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telegram api error: status={status} description={description}")]
    Api {
        status: StatusCode,
        description: String,
    },
}

#[derive(Deserialize)]
struct TelegramReply {
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http_client: HTTPClient,
    chat_id: String,
    send_url: String,
}

impl TelegramNotifier {
    pub fn new(http_client: HTTPClient, settings: TelegramSettings) -> Self {
        let send_url = format!(
            "{}/bot{}/sendMessage",
            settings.api_url.trim_end_matches('/'),
            settings.token
        );
        Self {
            http_client,
            chat_id: settings.chat_id,
            send_url,
        }
    }

    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .http_client
            .get(&self.send_url)
            .query(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let description = serde_json::from_str::<TelegramReply>(&body)
            .ok()
            .and_then(|reply| reply.description)
            .unwrap_or(body);
        Err(NotifyError::Api {
            status,
            description,
        })
    }
}

/// Strictly greater: a reading equal to the threshold does not alert.
pub fn exceeds_threshold(value: f64, threshold: f64) -> bool {
    value > threshold
}

pub fn alert_message(value: f64, threshold: f64) -> String {
    format!(
        "🌱 Greenhouse Alert!\nCurrent Temp: {}°C\nThreshold: {}°C\nCheck your plants!",
        format_celsius(value),
        format_celsius(threshold)
    )
}

/// Renders whole numbers with one decimal place so `23` reads as `23.0`.
pub fn format_celsius(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
