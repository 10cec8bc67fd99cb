use crate::alerts::{DEFAULT_TELEGRAM_API_URL, TelegramSettings};
use anyhow::{Context, Result, anyhow, bail};
use greenhouse_influx::{
    DEFAULT_BUCKET, DEFAULT_FIELD, DEFAULT_MEASUREMENT, DEFAULT_RANGE_MINUTES, InfluxSettings,
};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_THRESHOLD: f64 = 23.0;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub influx: InfluxSettings,
    pub telegram: TelegramSettings,
    pub threshold: f64,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("Missing env var: {key}"));

        let influx = InfluxSettings {
            url: required("INFLUX_URL")?,
            org: required("INFLUX_ORG")?,
            token: required("INFLUX_TOKEN")?,
            bucket: lookup("INFLUX_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            measurement: lookup("INFLUX_MEASUREMENT")
                .unwrap_or_else(|| DEFAULT_MEASUREMENT.to_string()),
            field: lookup("INFLUX_FIELD").unwrap_or_else(|| DEFAULT_FIELD.to_string()),
            range_minutes: positive_var(&lookup, "INFLUX_RANGE_MINUTES", DEFAULT_RANGE_MINUTES)?,
        };

        let telegram = TelegramSettings {
            api_url: lookup("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            token: required("TELE_TOKEN")?,
            chat_id: required("TELE_CHAT_ID")?,
        };

        let threshold = parse_or(lookup("TEMP_THRESHOLD"), "TEMP_THRESHOLD", DEFAULT_THRESHOLD)?;
        if !threshold.is_finite() {
            bail!("TEMP_THRESHOLD must be a finite number, got {threshold}");
        }

        let poll_interval =
            positive_var(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let http_timeout = positive_var(&lookup, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        Ok(Self {
            influx,
            telegram,
            threshold,
            poll_interval: Duration::from_secs(poll_interval),
            http_timeout: Duration::from_secs(http_timeout),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("Failed to parse {key} value '{value}'")),
        None => Ok(default),
    }
}

fn positive_var(lookup: impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    let value = parse_or(lookup(key), key, default)?;
    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}
