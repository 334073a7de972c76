//! Retrying HTTP transport shared by the remote API clients.
//!
//! Only transport failures and throttling/server-side statuses are retried.
//! Every other response is handed back untouched so the caller can map the
//! remote problem document onto a domain error.

use std::time::Duration;

use mailsync_domain::MailsyncError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::errors::InfraError;

/// Backoff schedule for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: usize,
    pub base_delay: Duration,
    /// Upper bound for any single wait, server hints included
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Wait before retry number `retry` (1-based). A `Retry-After` hint from
    /// the server replaces the doubling schedule; both are capped.
    pub fn delay(&self, retry: usize, hint: Option<Duration>) -> Duration {
        let doubling = || {
            let shift = retry.saturating_sub(1).min(16) as u32;
            self.base_delay.saturating_mul(1u32 << shift)
        };
        hint.unwrap_or_else(doubling).min(self.max_delay)
    }

    /// Worst-case wall time of one call when each attempt may take
    /// `per_attempt` and every wait hits the cap.
    pub fn budget(&self, per_attempt: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        let waits = attempts.saturating_sub(1);
        per_attempt
            .saturating_mul(attempts as u32)
            .saturating_add(self.max_delay.saturating_mul(waits as u32))
    }
}

/// reqwest client plus the retry schedule applied by [`HttpClient::send`].
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, MailsyncError> {
        Self::builder().build()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute `builder`, retrying connection failures, timeouts, 429 and 5xx.
    ///
    /// Once attempts run out the last response is returned whatever its
    /// status; a last transport failure becomes `MailsyncError::Network`.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, MailsyncError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    MailsyncError::Internal("streaming request bodies cannot be retried".into())
                })?
                .build()
                .map_err(to_domain_error)?;
            let method = request.method().clone();
            let url = redacted(request.url());

            let result = self.client.execute(request).await;
            let retry_hint = match &result {
                Ok(response) if is_retryable_status(response.status()) => {
                    Some(retry_after(response))
                }
                Err(err) if is_retryable_error(err) => Some(None),
                _ => None,
            };

            match retry_hint {
                Some(hint) if attempt < attempts => {
                    let delay = self.retry.delay(attempt, hint);
                    debug!(
                        attempt,
                        %method,
                        %url,
                        outcome = %describe(&result),
                        delay_ms = delay.as_millis() as u64,
                        "Transient HTTP failure, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                _ => {
                    debug!(attempt, %method, %url, outcome = %describe(&result), "HTTP exchange done");
                    return result.map_err(to_domain_error);
                }
            }
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    retry: RetryPolicy,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), retry: RetryPolicy::default(), user_agent: None }
    }
}

impl HttpClientBuilder {
    /// Per-attempt transport timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.retry.max_attempts = attempts.max(1);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, MailsyncError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(to_domain_error)?;
        Ok(HttpClient { client, retry: self.retry })
    }
}

fn to_domain_error(err: reqwest::Error) -> MailsyncError {
    MailsyncError::from(InfraError::from(err))
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn describe(result: &Result<Response, reqwest::Error>) -> String {
    match result {
        Ok(response) => response.status().to_string(),
        Err(err) => err.to_string(),
    }
}

/// URL for logging with the `apikey` query parameter masked.
fn redacted(url: &reqwest::Url) -> String {
    if !url.query_pairs().any(|(key, _)| key == "apikey") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "apikey" { "***".to_string() } else { value.into_owned() };
            (key.into_owned(), value)
        })
        .collect();
    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn quick_retries(max_attempts: usize) -> HttpClient {
        HttpClient::builder()
            .retry_policy(RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
            })
            .build()
            .expect("http client")
    }

    #[test]
    fn delay_doubles_and_respects_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };

        assert_eq!(policy.delay(1, None), Duration::from_millis(100));
        assert_eq!(policy.delay(3, None), Duration::from_millis(400));
        assert_eq!(policy.delay(10, None), Duration::from_secs(1));
        assert_eq!(policy.delay(1, Some(Duration::from_secs(60))), Duration::from_secs(1));
        assert_eq!(policy.delay(4, Some(Duration::ZERO)), Duration::ZERO);
    }

    #[test]
    fn budget_spans_all_attempts_and_waits() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.budget(Duration::from_secs(30)), Duration::from_secs(110));
        assert_eq!(RetryPolicy::none().budget(Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn service_unavailable_is_retried_until_success() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        Mock::given(method("GET"))
            .respond_with(move |_: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_string("ok")
                }
            })
            .mount(&server)
            .await;

        let client = quick_retries(3);
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn throttled_requests_return_the_last_response_when_attempts_run_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .expect(2)
            .mount(&server)
            .await;

        let client = quick_retries(2);
        let builder = client.request(Method::POST, server.uri()).body("{}");
        let response = client.send(builder).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn bad_requests_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let client = quick_retries(3);
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refused_connections_become_network_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = quick_retries(2);
        let result = client.send(client.request(Method::GET, format!("http://{addr}"))).await;

        match result {
            Err(MailsyncError::Network(msg)) => assert!(msg.to_lowercase().contains("http")),
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[test]
    fn api_keys_are_masked_in_logged_urls() {
        let url = reqwest::Url::parse(
            "https://us6.api.mailchimp.com/export/1.0/list/?apikey=secret-us6&id=l1",
        )
        .unwrap();

        let logged = redacted(&url);

        assert!(!logged.contains("secret"));
        assert!(logged.contains("id=l1"));
    }
}
