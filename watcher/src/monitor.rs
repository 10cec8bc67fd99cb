use crate::alerts::{
    NotifyError, TelegramNotifier, alert_message, exceeds_threshold, format_celsius,
};
use crate::logging::Logger;
use greenhouse_influx::{FetchError, InfluxClient, Reading};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub trait ReadingSource {
    async fn latest(&self) -> Result<Reading, FetchError>;
}

pub trait Notifier {
    async fn notify(&self, value: f64, threshold: f64) -> Result<(), NotifyError>;
}

impl ReadingSource for InfluxClient {
    async fn latest(&self) -> Result<Reading, FetchError> {
        self.fetch_latest().await
    }
}

impl Notifier for TelegramNotifier {
    async fn notify(&self, value: f64, threshold: f64) -> Result<(), NotifyError> {
        self.send(&alert_message(value, threshold)).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    BelowThreshold(f64),
    Alerted(f64),
    AlertFailed(f64),
    NoData,
}

pub struct Monitor<S, N> {
    source: S,
    notifier: N,
    field: String,
    threshold: f64,
    interval: Duration,
}

impl<S: ReadingSource, N: Notifier> Monitor<S, N> {
    pub fn new(
        source: S,
        notifier: N,
        field: impl Into<String>,
        threshold: f64,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            notifier,
            field: field.into(),
            threshold,
            interval,
        }
    }

    pub async fn poll_once(&self) -> PollOutcome {
        let logger = Logger::new().field(&self.field).threshold(self.threshold);

        let reading = match self.source.latest().await {
            Ok(reading) => reading,
            Err(err) => {
                if !err.is_no_data() {
                    logger.error("reading.failed", &err, "Failed to fetch latest reading");
                }
                logger
                    .clone()
                    .error_text(err.to_string())
                    .info("reading.missing", "Searching for data...");
                return PollOutcome::NoData;
            }
        };

        let value = reading.value;
        let logger = logger.value(value);
        logger.info(
            "reading.latest",
            &format!("Latest {}: {}°C", self.field, format_celsius(value)),
        );

        if !exceeds_threshold(value, self.threshold) {
            return PollOutcome::BelowThreshold(value);
        }

        logger.warn("threshold.exceeded", "Threshold exceeded! Sending Telegram...");
        match self.notifier.notify(value, self.threshold).await {
            Ok(()) => {
                logger.info("alert.sent", "Alert sent");
                PollOutcome::Alerted(value)
            }
            Err(err) => {
                logger.error("alert.failed", &err, "Failed to send alert");
                PollOutcome::AlertFailed(value)
            }
        }
    }

    /// Polls until `shutdown` resolves; returns how many polls ran.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> usize {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut polls = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.poll_once().await;
                    polls += 1;
                }
            }
        }

        Logger::new()
            .threshold(self.threshold)
            .info("watcher.stopped", &format!("Stopped after {polls} polls"));
        polls
    }
}
