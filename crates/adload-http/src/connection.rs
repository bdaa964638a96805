//! reqwest-backed server connection.
//!
//! Implements exponential backoff for transient server errors (5xx) and
//! network errors. Client errors (4xx) fail immediately.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use adload_core::{ConnectionError, ServerConnectionPort};

use crate::config::HttpConnectionConfig;
use crate::error::{HttpError, HttpResult};

/// Production download channel using reqwest with retry logic.
#[derive(Debug, Clone)]
pub struct ReqwestConnection {
    client: reqwest::Client,
    max_retries: u8,
    retry_base_delay: Duration,
}

impl ReqwestConnection {
    /// Create a connection with the given configuration.
    pub fn new(config: &HttpConnectionConfig) -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    /// Fetch a URL with automatic retry for transient errors.
    async fn fetch_with_retry(&self, url: &Url) -> HttpResult<Bytes> {
        let mut last_error: Option<HttpError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.retry_base_delay, attempt);
                tracing::debug!(
                    target: "adload.http",
                    url = %url,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Retrying fetch"
                );
                tokio::time::sleep(delay).await;
            }

            match self.client.get(url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.bytes().await {
                            Ok(body) => return Ok(body),
                            Err(e) if attempt < self.max_retries => {
                                last_error = Some(e.into());
                                continue;
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }

                    let error = HttpError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    };

                    // 5xx errors are retryable (server-side issues)
                    if is_retryable_status(status.as_u16()) && attempt < self.max_retries {
                        last_error = Some(error);
                        continue;
                    }

                    // 4xx errors or final attempt - fail immediately
                    return Err(error);
                }
                Err(e) => {
                    // Network errors are retryable
                    if attempt < self.max_retries {
                        last_error = Some(e.into());
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| HttpError::Status {
            status: 0,
            url: url.to_string(),
        }))
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff_delay(base: Duration, attempt: u8) -> Duration {
    let factor = 2u32.saturating_pow(u32::from(attempt.saturating_sub(1)));
    base.saturating_mul(factor)
}

/// Server-side failures are worth retrying.
const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 500..=599)
}

/// Parse and check an asset URL.
fn parse_asset_url(raw: &str) -> HttpResult<Url> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(HttpError::UnsupportedScheme {
            scheme: scheme.to_string(),
        }),
    }
}

#[async_trait]
impl ServerConnectionPort for ReqwestConnection {
    async fn fetch(&self, url: &str) -> Result<Bytes, ConnectionError> {
        let parsed = parse_asset_url(url)?;
        let body = self.fetch_with_retry(&parsed).await.map_err(|e| {
            tracing::debug!(target: "adload.http", url = %url, error = %e, "Fetch failed");
            e
        })?;
        tracing::trace!(target: "adload.http", url = %url, bytes = body.len(), "Fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fast_config(max_retries: u8) -> HttpConnectionConfig {
        HttpConnectionConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(max_retries)
            .with_retry_delay(Duration::from_millis(1))
    }

    fn response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Serve the scripted responses in order, one per connection.
    async fn serve(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            for reply in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/asset.png"), hits)
    }

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(400));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(429));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        assert!(matches!(
            parse_asset_url("ftp://cdn.example/a.png"),
            Err(HttpError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            parse_asset_url("::"),
            Err(HttpError::InvalidUrl(_))
        ));
        assert!(parse_asset_url("https://cdn.example/a.png").is_ok());
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let (url, hits) = serve(vec![response("200 OK", "png-bytes")]).await;
        let connection = ReqwestConnection::new(&fast_config(0)).unwrap();

        let body = connection.fetch(&url).await.unwrap();

        assert_eq!(body, Bytes::from_static(b"png-bytes"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (url, hits) = serve(vec![
            response("503 Service Unavailable", ""),
            response("502 Bad Gateway", ""),
            response("200 OK", "ok"),
        ])
        .await;
        let connection = ReqwestConnection::new(&fast_config(3)).unwrap();

        let body = connection.fetch(&url).await.unwrap();

        assert_eq!(body, Bytes::from_static(b"ok"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_fail_immediately() {
        let (url, hits) = serve(vec![
            response("404 Not Found", ""),
            response("200 OK", "unreachable"),
        ])
        .await;
        let connection = ReqwestConnection::new(&fast_config(3)).unwrap();

        let error = connection.fetch(&url).await.unwrap_err();

        assert_eq!(error.status_code, Some(404));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let (url, hits) = serve(vec![
            response("500 Internal Server Error", ""),
            response("500 Internal Server Error", ""),
        ])
        .await;
        let connection = ReqwestConnection::new(&fast_config(1)).unwrap();

        let error = connection.fetch(&url).await.unwrap_err();

        assert_eq!(error.status_code, Some(500));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
