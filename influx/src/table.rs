//! Parsing of the CSV returned by the query API.
//!
//! Both plain CSV (`_time,temperature`) and InfluxDB annotated CSV are
//! accepted: `#` annotation rows are skipped, blank lines separate tables and
//! the first record of every table is its header.

use crate::{FetchError, Reading};
use chrono::{DateTime, Utc};

const TIME_COLUMN: &str = "_time";

#[derive(Debug, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

pub fn parse_tables(payload: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Option<Table> = None;

    for line in payload.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            if let Some(table) = current.take() {
                tables.push(table);
            }
            continue;
        }

        let record = split_record(line);
        match current.as_mut() {
            Some(table) => table.rows.push(record),
            None => {
                current = Some(Table {
                    columns: record,
                    rows: Vec::new(),
                })
            }
        }
    }

    if let Some(table) = current {
        tables.push(table);
    }
    tables
}

/// Value of `field` in the last data row of the last table that has the column.
pub fn latest_reading(payload: &str, field: &str) -> Result<Reading, FetchError> {
    let tables = parse_tables(payload);
    let mut has_column = false;
    let mut latest = None;

    for table in &tables {
        let Some(index) = table.column(field) else {
            continue;
        };
        has_column = true;
        if let Some(row) = table.rows.last() {
            latest = Some((table, row, index));
        }
    }

    let Some((table, row, index)) = latest else {
        return Err(if has_column {
            FetchError::EmptyTable {
                field: field.to_string(),
            }
        } else {
            FetchError::MissingField {
                field: field.to_string(),
            }
        });
    };

    let raw = row.get(index).map(|value| value.trim()).unwrap_or_default();
    let value = parse_value(raw).ok_or_else(|| FetchError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    })?;
    let time = table
        .column(TIME_COLUMN)
        .and_then(|index| row.get(index))
        .and_then(|raw| parse_time(raw));

    Ok(Reading { value, time })
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(ch),
        }
    }
    fields.push(field);
    fields
}
