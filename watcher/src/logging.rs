use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub(crate) const TARGET: &str = "greenhouse_watcher";
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub(crate) fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

pub(crate) fn init(format: LogFormat) {
    // `RUST_LOG` wins over the default filter
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_target(false)
            .init(),
        LogFormat::Text => builder.with_target(false).init(),
    }
}

#[derive(Clone, Default)]
pub(crate) struct Logger {
    field: Option<String>,
    threshold: Option<f64>,
    value: Option<f64>,
    error_text: Option<String>,
}

impl Logger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub(crate) fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub(crate) fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub(crate) fn error_text(mut self, error_text: impl Into<String>) -> Self {
        self.error_text = Some(error_text.into());
        self
    }

    pub(crate) fn info(&self, event: &'static str, message: &str) {
        info!(
            target: TARGET,
            event,
            field = self.field.as_deref(),
            threshold = self.threshold,
            value = self.value,
            error_text = self.error_text.as_deref(),
            "{}",
            message
        );
    }

    pub(crate) fn warn(&self, event: &'static str, message: &str) {
        warn!(
            target: TARGET,
            event,
            field = self.field.as_deref(),
            threshold = self.threshold,
            value = self.value,
            "{}",
            message
        );
    }

    pub(crate) fn error<E: std::fmt::Display>(&self, event: &'static str, err: &E, message: &str) {
        error!(
            target: TARGET,
            event,
            field = self.field.as_deref(),
            threshold = self.threshold,
            value = self.value,
            error = %err,
            "{}",
            message
        );
    }
}
