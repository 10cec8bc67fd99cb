use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("query transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("query failed: {status} {body}")]
    Status { status: StatusCode, body: String },
    #[error("query returned an empty body")]
    EmptyBody,
    #[error("column '{field}' not found in query result")]
    MissingField { field: String },
    #[error("query result has no rows for '{field}'")]
    EmptyTable { field: String },
    #[error("value '{value}' of '{field}' is not a finite number")]
    InvalidValue { field: String, value: String },
}

impl FetchError {
    /// True when the source answered but had nothing to report, as opposed to a fault.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            FetchError::EmptyBody | FetchError::MissingField { .. } | FetchError::EmptyTable { .. }
        )
    }
}
