//! HTTP plumbing for translation services with safe request logging.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Method;
use tracing::info;
use url::Url;

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// User agent sent with every request. The web endpoint rejects clients
/// without a browser-like agent.
const CLIENT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 csv-translate/0.1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Query parameter keys (case-insensitive) whose values are never logged.
/// `q` carries the text being translated.
const SENSITIVE_QUERY_PARAMS: &[&str] = &["key", "api_key", "q", "token"];

// ─────────────────────────────────────────────────────────────────────────────
// LoggingMode
// ─────────────────────────────────────────────────────────────────────────────

/// Controls how URLs are sanitized for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoggingMode {
    /// Log only the path component.
    /// Example: `/translate_a/single`
    #[default]
    PathOnly,

    /// Log path and query parameters, redacting sensitive values.
    /// Example: `/translate_a/single?client=gtx&sl=en&tl=zh-CN&q=***`
    PathAndQueryRedacted,
}

fn is_sensitive_param(key: &str) -> bool {
    let key_lower = key.to_ascii_lowercase();
    SENSITIVE_QUERY_PARAMS
        .iter()
        .any(|&sensitive| key_lower == sensitive)
}

/// Sanitizes a URL for safe logging based on the specified mode.
///
/// The result never contains the scheme, host, or fragment.
pub fn sanitize_url_for_logs(url: &Url, mode: LoggingMode) -> String {
    let path = url.path();

    match mode {
        LoggingMode::PathOnly => path.to_string(),
        LoggingMode::PathAndQueryRedacted => {
            let pairs: Vec<String> = url
                .query_pairs()
                .map(|(key, value)| {
                    if is_sensitive_param(&key) {
                        format!("{}=***", key)
                    } else {
                        format!("{}={}", key, value)
                    }
                })
                .collect();

            if pairs.is_empty() {
                path.to_string()
            } else {
                format!("{}?{}", path, pairs.join("&"))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HttpClient
// ─────────────────────────────────────────────────────────────────────────────

/// reqwest client that logs every request without leaking keys or text.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    logging_mode: LoggingMode,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client fails to initialize.
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            logging_mode: LoggingMode::default(),
        })
    }

    pub fn with_logging_mode(mut self, mode: LoggingMode) -> Self {
        self.logging_mode = mode;
        self
    }

    /// Sends a request, optionally with a JSON body, and logs the outcome.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConnectionFailed` when no response was received.
    /// The error message never contains the raw URL.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        json_body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, AppError> {
        let start = Instant::now();
        let sanitized_url = sanitize_url_for_logs(&url, self.logging_mode);

        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = json_body {
            request = request.json(body);
        }

        let result = request.send().await;
        let duration_ms = start.elapsed().as_millis();

        match result {
            Ok(response) => {
                info!(
                    "[HTTP] {} {} {} {}ms",
                    method,
                    sanitized_url,
                    response.status().as_u16(),
                    duration_ms
                );
                Ok(response)
            }
            Err(e) => {
                info!("[HTTP] {} {} FAILED {}ms", method, sanitized_url, duration_ms);
                let reason = if e.is_timeout() {
                    "request timed out"
                } else if e.is_connect() {
                    "could not connect"
                } else {
                    "request failed"
                };
                Err(AppError::ConnectionFailed(format!(
                    "{} {}: {}",
                    method, sanitized_url, reason
                )))
            }
        }
    }
}

/// Builds the configured reqwest client.
fn build_http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn path_only_strips_host_and_query() {
        let url = Url::parse(
            "https://translate.googleapis.com/translate_a/single?client=gtx&q=secret+text",
        )
        .unwrap();

        let result = sanitize_url_for_logs(&url, LoggingMode::PathOnly);

        assert_eq!(result, "/translate_a/single");
    }

    #[test]
    fn redacted_mode_hides_key_and_text() {
        let url = Url::parse(
            "https://translation.googleapis.com/language/translate/v2?KEY=AIzaSecret&q=Hello&format=text",
        )
        .unwrap();

        let result = sanitize_url_for_logs(&url, LoggingMode::PathAndQueryRedacted);

        assert_eq!(result, "/language/translate/v2?KEY=***&q=***&format=text");
        assert!(!result.contains("AIzaSecret"));
        assert!(!result.contains("Hello"));
    }

    #[test]
    fn redacted_mode_without_query() {
        let url = Url::parse("https://example.com/path#frag").unwrap();
        assert_eq!(
            sanitize_url_for_logs(&url, LoggingMode::PathAndQueryRedacted),
            "/path"
        );
    }

    #[tokio::test]
    async fn send_attaches_user_agent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/ping", mock_server.uri())).unwrap();
        let response = client.send(Method::GET, url, None).await.unwrap();

        assert_eq!(response.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn unreachable_host_is_connection_failed_without_url() {
        let client = HttpClient::new(Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on localhost is not listening in test environments
        let url = Url::parse("http://127.0.0.1:9/language/translate/v2?key=AIzaSecret").unwrap();

        let result = client.send(Method::POST, url, None).await;

        match result {
            Err(AppError::ConnectionFailed(msg)) => assert!(!msg.contains("AIzaSecret")),
            other => panic!("expected ConnectionFailed, got {:?}", other.map(|r| r.status())),
        }
    }
}
