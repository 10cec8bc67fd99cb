pub mod client;
mod error;
pub mod query;
pub mod table;

use chrono::{DateTime, Utc};

pub use client::{InfluxClient, InfluxSettings, interpret_response};
pub use error::FetchError;

pub const DEFAULT_BUCKET: &str = "green_house";
pub const DEFAULT_MEASUREMENT: &str = "environment";
pub const DEFAULT_FIELD: &str = "temperature";
pub const DEFAULT_RANGE_MINUTES: u64 = 10;

/// Latest value of the watched field, as returned by a single query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f64,
    /// `_time` of the row, when the table carries one.
    pub time: Option<DateTime<Utc>>,
}
