// src/llm/http_client.rs
// Shared HTTP client for provider calls with bounded rate-limit retry

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, StoryError};

/// Default ceiling on attempts (first try included) while rate limited
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default starting backoff when the provider sends no retry-after (doubles each retry)
pub const DEFAULT_BASE_BACKOFF_SECS: u64 = 1;

/// HTTP client for provider endpoints.
///
/// Only HTTP 429 is retried. Any other failure (connect error, timeout,
/// non-success status) is surfaced on the first occurrence.
#[derive(Clone)]
pub struct LlmHttpClient {
    client: Client,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl LlmHttpClient {
    /// Wrap an existing reqwest::Client (shares its connection pool)
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_secs(DEFAULT_BASE_BACKOFF_SECS),
        }
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, base_backoff: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.base_backoff = base_backoff;
        self
    }

    /// POST a JSON body with Bearer auth, retrying on 429 up to `max_attempts`.
    pub async fn post_json_with_retry<B, T>(
        &self,
        request_id: &str,
        url: &str,
        api_key: &str,
        body: &B,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(request_id, url, api_key, body, self.max_attempts)
            .await
    }

    /// POST a JSON body with Bearer auth, single attempt.
    pub async fn post_json<B, T>(
        &self,
        request_id: &str,
        url: &str,
        api_key: &str,
        body: &B,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(request_id, url, api_key, body, 1).await
    }

    async fn execute<B, T>(
        &self,
        request_id: &str,
        url: &str,
        api_key: &str,
        body: &B,
        max_attempts: u32,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempts = 0;
        let mut backoff = self.base_backoff;

        loop {
            attempts += 1;

            let response = self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await
                .map_err(|e| StoryError::UpstreamTransport(format!("{url}: {e}")))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let delay = retry_after(response.headers()).unwrap_or(backoff);
                let error_body = response.text().await.unwrap_or_default();

                if attempts >= max_attempts {
                    warn!(
                        request_id = %request_id,
                        attempts,
                        error = %error_body,
                        "Rate limit retries exhausted"
                    );
                    return Err(StoryError::UpstreamRateLimited { attempts });
                }

                warn!(
                    request_id = %request_id,
                    attempt = attempts,
                    "Rate limited, retrying in {:?}...",
                    delay
                );
                tokio::time::sleep(delay).await;
                backoff = backoff.saturating_mul(2);
                continue;
            }

            if !status.is_success() {
                let error_body = response.text().await.unwrap_or_default();
                return Err(StoryError::UpstreamTransport(format!(
                    "API error {status}: {error_body}"
                )));
            }

            let text = response
                .text()
                .await
                .map_err(|e| StoryError::UpstreamTransport(format!("{url}: {e}")))?;
            debug!(request_id = %request_id, bytes = text.len(), "Provider response received");

            return serde_json::from_str(&text)
                .map_err(|e| StoryError::MalformedResponse(format!("{e}: {text}")));
        }
    }
}

/// Delay requested by a `retry-after` header given in whole seconds
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_mock;
    use axum::{
        Json, Router, extract::State, http::HeaderValue, response::IntoResponse, routing::post,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn client(max_attempts: u32, base_backoff: Duration) -> LlmHttpClient {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        LlmHttpClient::from_client(client).with_retry_policy(max_attempts, base_backoff)
    }

    /// Mock provider answering 429 for the first `limited` hits, then 200.
    async fn rate_limited_server(
        limited: u32,
        retry_after: Option<&'static str>,
    ) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(move |State(hits): State<Arc<AtomicU32>>| async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    if n <= limited {
                        let mut response =
                            (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
                        if let Some(secs) = retry_after {
                            response
                                .headers_mut()
                                .insert(RETRY_AFTER, HeaderValue::from_static(secs));
                        }
                        response
                    } else {
                        Json(json!({ "ok": true, "hit": n })).into_response()
                    }
                }),
            )
            .with_state(hits.clone());

        (spawn_mock(app).await, hits)
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_MAX_ATTEMPTS, 5);
        assert_eq!(DEFAULT_BASE_BACKOFF_SECS, 1);
        let client = LlmHttpClient::from_client(Client::new());
        assert_eq!(client.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(client.base_backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(2)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[tokio::test]
    async fn test_waits_for_retry_after_before_retrying() {
        let (base, hits) = rate_limited_server(1, Some("2")).await;
        let client = client(5, Duration::from_millis(10));

        let started = Instant::now();
        let body: Value = client
            .post_json_with_retry("test", &format!("{base}/v1/chat/completions"), "key", &json!({}))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(body["hit"], 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_ceiling() {
        let (base, hits) = rate_limited_server(u32::MAX, Some("0")).await;
        let client = client(5, Duration::from_millis(10));

        let result: Result<Value> = client
            .post_json_with_retry("test", &format!("{base}/v1/chat/completions"), "key", &json!({}))
            .await;

        match result {
            Err(StoryError::UpstreamRateLimited { attempts }) => assert_eq!(attempts, 5),
            other => panic!("expected rate limit error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_backoff_doubles_without_retry_after() {
        let (base, hits) = rate_limited_server(u32::MAX, None).await;
        let client = client(3, Duration::from_millis(50));

        let started = Instant::now();
        let result: Result<Value> = client
            .post_json_with_retry("test", &format!("{base}/v1/chat/completions"), "key", &json!({}))
            .await;

        assert!(matches!(result, Err(StoryError::UpstreamRateLimited { attempts: 3 })));
        // 50ms + 100ms
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let (base, hits) = rate_limited_server(1, Some("0")).await;
        let client = client(5, Duration::from_millis(10));

        let result: Result<Value> = client
            .post_json("test", &format!("{base}/v1/chat/completions"), "key", &json!({}))
            .await;

        assert!(matches!(result, Err(StoryError::UpstreamRateLimited { attempts: 1 })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(|State(hits): State<Arc<AtomicU32>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::BAD_GATEWAY, "provider down")
                }),
            )
            .with_state(hits.clone());
        let base = spawn_mock(app).await;

        let result: Result<Value> = client(5, Duration::from_millis(10))
            .post_json_with_retry("test", &format!("{base}/v1/chat/completions"), "key", &json!({}))
            .await;

        match result {
            Err(StoryError::UpstreamTransport(msg)) => assert!(msg.contains("provider down")),
            other => panic!("expected transport error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let url = "http://127.0.0.1:1/v1/chat/completions";
        let result: Result<Value> = client(5, Duration::from_millis(10))
            .post_json_with_retry("test", url, "key", &json!({}))
            .await;
        assert!(matches!(result, Err(StoryError::UpstreamTransport(_))));
    }
}
