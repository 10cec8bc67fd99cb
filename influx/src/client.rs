use crate::query::LatestRecordQuery;
use crate::table::latest_reading;
use crate::{FetchError, Reading};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as HTTPClient, StatusCode};
use std::fmt;
use tracing::debug;

const QUERY_PATH: &str = "/api/v2/query";
const FLUX_CONTENT_TYPE: &str = "application/vnd.flux; charset=utf-8";
const CSV_ACCEPT: &str = "application/csv";
const MAX_BODY_PREVIEW: usize = 400;

#[derive(Clone)]
pub struct InfluxSettings {
    /// Instance base URL, without the API path.
    pub url: String,
    pub org: String,
    pub token: String,
    pub bucket: String,
    pub measurement: String,
    pub field: String,
    pub range_minutes: u64,
}

impl fmt::Debug for InfluxSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxSettings")
            .field("url", &self.url)
            .field("org", &self.org)
            .field("token", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("measurement", &self.measurement)
            .field("field", &self.field)
            .field("range_minutes", &self.range_minutes)
            .finish()
    }
}

pub struct InfluxClient {
    http_client: HTTPClient,
    settings: InfluxSettings,
    query_url: String,
}

impl InfluxClient {
    pub fn new(http_client: HTTPClient, settings: InfluxSettings) -> Self {
        let query_url = format!("{}{QUERY_PATH}", settings.url.trim_end_matches('/'));
        Self {
            http_client,
            settings,
            query_url,
        }
    }

    pub fn query(&self) -> String {
        LatestRecordQuery {
            bucket: &self.settings.bucket,
            measurement: &self.settings.measurement,
            range_minutes: self.settings.range_minutes,
        }
        .to_string()
    }

    pub async fn fetch_latest(&self) -> Result<Reading, FetchError> {
        let response = self
            .http_client
            .post(&self.query_url)
            .query(&[("org", self.settings.org.as_str())])
            .header(AUTHORIZATION, format!("Token {}", self.settings.token))
            .header(CONTENT_TYPE, FLUX_CONTENT_TYPE)
            .header(ACCEPT, CSV_ACCEPT)
            .body(self.query())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, bytes = body.len(), "influx query answered");
        interpret_response(status, &body, &self.settings.field)
    }
}

/// Turns a query response into a reading. Non-success statuses never look at the body.
pub fn interpret_response(
    status: StatusCode,
    body: &str,
    field: &str,
) -> Result<Reading, FetchError> {
    if !status.is_success() {
        return Err(FetchError::Status {
            status,
            body: preview(body),
        });
    }
    if body.trim().is_empty() {
        return Err(FetchError::EmptyBody);
    }
    latest_reading(body, field)
}

fn preview(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_BODY_PREVIEW {
        return body.to_string();
    }
    let mut text: String = body.chars().take(MAX_BODY_PREVIEW).collect();
    text.push_str("...");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn settings(url: String) -> InfluxSettings {
        InfluxSettings {
            url,
            org: "weather.parameter".to_string(),
            token: "secret-token".to_string(),
            bucket: "green_house".to_string(),
            measurement: "environment".to_string(),
            field: "temperature".to_string(),
            range_minutes: 10,
        }
    }

    fn local_client() -> HTTPClient {
        HTTPClient::builder().no_proxy().build().unwrap()
    }

    /// Answers a single HTTP request and hands back the raw request text.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: text/csv\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&buffer);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    #[test]
    fn success_with_table_returns_last_value() {
        let body = "_time,temperature\n2024-01-01T00:00:00Z,24.5\n";
        let reading = interpret_response(StatusCode::OK, body, "temperature").unwrap();
        assert_eq!(reading.value, 24.5);
    }

    #[test]
    fn server_error_is_absence_regardless_of_body() {
        let body = "_time,temperature\n2024-01-01T00:00:00Z,24.5\n";
        let err = interpret_response(StatusCode::INTERNAL_SERVER_ERROR, body, "temperature")
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[test]
    fn blank_body_is_empty() {
        for body in ["", "  \r\n"] {
            let err = interpret_response(StatusCode::OK, body, "temperature").unwrap_err();
            assert!(matches!(err, FetchError::EmptyBody));
        }
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err =
            interpret_response(StatusCode::BAD_REQUEST, &body, "temperature").unwrap_err();
        let FetchError::Status { body, .. } = err else {
            panic!("expected status error");
        };
        assert_eq!(body.len(), MAX_BODY_PREVIEW + 3);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn query_url_ignores_trailing_slash() {
        let client = InfluxClient::new(
            HTTPClient::new(),
            settings("https://influx.example.com/".to_string()),
        );
        assert_eq!(client.query_url, "https://influx.example.com/api/v2/query");
    }

    #[tokio::test]
    async fn fetch_latest_sends_authenticated_flux_query() {
        let (url, server) = serve_once(
            "200 OK",
            "_time,temperature\n2024-01-01T00:00:00Z,24.5\n",
        )
        .await;
        let client = InfluxClient::new(local_client(), settings(url));

        let reading = client.fetch_latest().await.unwrap();
        assert_eq!(reading.value, 24.5);

        let request = server.await.unwrap();
        let lowered = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /api/v2/query?org=weather.parameter HTTP/1.1"));
        assert!(lowered.contains("authorization: token secret-token"));
        assert!(lowered.contains("content-type: application/vnd.flux; charset=utf-8"));
        assert!(request.contains("from(bucket:\"green_house\")"));
        assert!(request.contains("r._measurement == \"environment\""));
    }

    #[tokio::test]
    async fn fetch_latest_maps_server_error() {
        let (url, server) = serve_once(
            "500 Internal Server Error",
            "_time,temperature\n2024-01-01T00:00:00Z,24.5\n",
        )
        .await;
        let client = InfluxClient::new(local_client(), settings(url));

        let err = client.fetch_latest().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fetch_latest_maps_empty_body() {
        let (url, server) = serve_once("200 OK", "").await;
        let client = InfluxClient::new(local_client(), settings(url));

        let err = client.fetch_latest().await.unwrap_err();
        assert!(err.is_no_data());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fetch_latest_reports_unreachable_source() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let client = InfluxClient::new(local_client(), settings(url));

        let err = client.fetch_latest().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
