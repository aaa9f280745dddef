//! HTTP pipeline client for Azure Resource Manager.
//!
//! This module provides [`ArmClient`], the transport every service client
//! forwards its requests through. The client handles authentication, the
//! endpoint, and transient-error retries; the per-operation URL templates
//! and `api-version` query parameters are owned by the service crates.
//!
//! # Examples
//!
//! ```rust,no_run
//! use azure_arm_core::client::ArmClient;
//! use azure_arm_core::auth::ArmCredential;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArmClient::builder()
//!     .credential(ArmCredential::bearer_token("eyJ0..."))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! Pointing at a sovereign cloud (or a test server):
//!
//! ```rust,no_run
//! use azure_arm_core::client::ArmClient;
//! use azure_arm_core::auth::ArmCredential;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArmClient::builder()
//!     .endpoint("https://management.usgovcloudapi.net")
//!     .credential(ArmCredential::bearer_token("eyJ0..."))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::auth::ArmCredential;
use crate::error::{ArmError, ArmResult};
use crate::models::ErrorResponse;
use reqwest::Client as HttpClient;
use reqwest::Method;
use url::Url;

use std::time::Duration;

/// The public Azure Resource Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient issues that may succeed on retry:
/// - 408 Request Timeout
/// - 429 Too Many Requests (rate limiting)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// The transport client shared by every Resource Manager service client.
///
/// Service crates (`azure_arm_security`, `azure_arm_kusto`, ...) wrap an
/// `ArmClient` together with a subscription id and format their operation
/// paths against it.
///
/// The client is cheaply cloneable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct ArmClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: ArmCredential,
    pub(crate) retry_policy: RetryPolicy,
}

/// Builder for constructing an [`ArmClient`].
///
/// Use [`ArmClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct ArmClientBuilder {
    endpoint: Option<String>,
    credential: Option<ArmCredential>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ArmClient {
    /// Create a new builder for configuring an `ArmClient`.
    pub fn builder() -> ArmClientBuilder {
        ArmClientBuilder::default()
    }

    /// Get the base endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Build a full URL for an operation path.
    ///
    /// The path is expected to carry its own `api-version` query parameter.
    pub fn url(&self, path: &str) -> ArmResult<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| ArmError::InvalidEndpoint(format!("failed to construct URL: {e}")))
    }

    /// Send a GET request for an operation path.
    pub async fn get(&self, path: &str) -> ArmResult<reqwest::Response> {
        let url = self.url(path)?;
        self.execute(Method::GET, url, None::<&()>).await
    }

    /// Send a GET request to an absolute URL.
    ///
    /// Used for `nextLink` continuations and `Azure-AsyncOperation` status
    /// monitors, both of which the service returns as absolute URLs.
    pub async fn get_absolute(&self, url: &str) -> ArmResult<reqwest::Response> {
        let url = Url::parse(url)
            .map_err(|e| ArmError::InvalidEndpoint(format!("invalid continuation URL: {e}")))?;
        self.execute(Method::GET, url, None::<&()>).await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> ArmResult<reqwest::Response> {
        let url = self.url(path)?;
        self.execute(Method::PUT, url, Some(body)).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> ArmResult<reqwest::Response> {
        let url = self.url(path)?;
        self.execute(Method::POST, url, Some(body)).await
    }

    /// Send a DELETE request for an operation path.
    pub async fn delete(&self, path: &str) -> ArmResult<reqwest::Response> {
        let url = self.url(path)?;
        self.execute(Method::DELETE, url, None::<&()>).await
    }

    /// Send a request with automatic retry on transient errors.
    ///
    /// Adds the authorization header, sends, and retries retriable HTTP
    /// statuses (see [`is_retriable_status`]) with exponential backoff and
    /// ±25% jitter. Any 2xx response is a success; everything else is
    /// turned into a typed error by [`Self::check_response`].
    async fn execute<T: serde::Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&T>,
    ) -> ArmResult<reqwest::Response> {
        let auth = self.credential.resolve().await?;

        for attempt in 0..=self.retry_policy.max_retries {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header("Authorization", &auth);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();

            if response.status().is_success() {
                return Ok(response);
            }

            if !is_retriable_status(status) || attempt == self.retry_policy.max_retries {
                return Self::check_response(response).await;
            }

            // Exponential backoff with jitter in [0.75, 1.25].
            let base_backoff = self.retry_policy.initial_backoff * 2_u32.pow(attempt);
            let jitter = 0.75 + fastrand::f64() * 0.5;
            let backoff = base_backoff.mul_f64(jitter);
            tracing::debug!(status, attempt, ?backoff, "retrying transient error");
            tokio::time::sleep(backoff).await;
        }

        unreachable!("retry loop should return before reaching here")
    }

    /// Maximum length of an error body surfaced in an error message.
    const MAX_ERROR_MESSAGE_LEN: usize = 1000;

    /// Truncate an error body so a multi-megabyte response cannot end up in
    /// a log line.
    fn truncate_message(msg: &str) -> String {
        if msg.len() > Self::MAX_ERROR_MESSAGE_LEN {
            let cut = msg
                .char_indices()
                .take_while(|(i, _)| *i < Self::MAX_ERROR_MESSAGE_LEN)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            format!("{}... (truncated)", &msg[..cut])
        } else {
            msg.to_string()
        }
    }

    /// Turn a non-2xx response into a typed error.
    ///
    /// ARM failures carry the `{"error": {"code", "message"}}` envelope;
    /// anything else (proxies, gateways) surfaces as a plain HTTP error
    /// with the raw body text.
    async fn check_response(response: reqwest::Response) -> ArmResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if let Ok(envelope) = serde_json::from_str::<ErrorResponse>(&body) {
            return Err(ArmError::Api {
                code: envelope.error.code,
                message: Self::truncate_message(&envelope.error.message),
            });
        }

        Err(ArmError::Http {
            status,
            message: Self::truncate_message(&body),
        })
    }
}

impl ArmClientBuilder {
    /// Set the Resource Manager endpoint URL.
    ///
    /// Defaults to [`DEFAULT_ENDPOINT`] (`https://management.azure.com`).
    /// If not set, the builder also checks the `AZURE_ARM_ENDPOINT`
    /// environment variable, which takes precedence over the default.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the credential to use for authentication.
    ///
    /// If not set, the builder will use [`ArmCredential::from_env()`].
    pub fn credential(mut self, credential: ArmCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set a custom HTTP client.
    ///
    /// Use this to configure proxies or other HTTP settings.
    ///
    /// **Note:** If you provide a custom HTTP client, any timeout
    /// configuration via [`connect_timeout`](Self::connect_timeout) or
    /// [`read_timeout`](Self::read_timeout) will be ignored.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout.
    ///
    /// This covers the entire request/response cycle including reading the
    /// body.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Defaults to 3 retries with 500ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the `ArmClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid or no credential is
    /// configured (neither via the builder nor `AZURE_ARM_ACCESS_TOKEN`).
    pub fn build(self) -> ArmResult<ArmClient> {
        let http = self.http_client.unwrap_or_else(|| {
            let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
            let read_timeout = self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT);

            reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .timeout(read_timeout)
                .build()
                .expect("failed to build HTTP client")
        });

        let endpoint_str = self
            .endpoint
            .or_else(|| std::env::var("AZURE_ARM_ENDPOINT").ok())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| ArmError::InvalidEndpoint(format!("invalid endpoint URL: {e}")))?;

        let credential = self
            .credential
            .map(Ok)
            .unwrap_or_else(ArmCredential::from_env)?;

        Ok(ArmClient {
            http,
            endpoint,
            credential,
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(endpoint: &str) -> ArmClient {
        ArmClient::builder()
            .endpoint(endpoint)
            .credential(ArmCredential::bearer_token("test-token"))
            .build()
            .expect("should build client")
    }

    #[test]
    #[serial]
    fn builder_defaults_to_public_endpoint() {
        std::env::remove_var("AZURE_ARM_ENDPOINT");

        let client = ArmClient::builder()
            .credential(ArmCredential::bearer_token("test"))
            .build()
            .expect("should build");

        assert_eq!(client.endpoint().as_str(), "https://management.azure.com/");
    }

    #[test]
    #[serial]
    fn builder_uses_endpoint_from_env() {
        std::env::set_var("AZURE_ARM_ENDPOINT", "https://management.example.test");

        let client = ArmClient::builder()
            .credential(ArmCredential::bearer_token("test"))
            .build()
            .expect("should build");

        assert_eq!(
            client.endpoint().as_str(),
            "https://management.example.test/"
        );

        std::env::remove_var("AZURE_ARM_ENDPOINT");
    }

    #[test]
    #[serial]
    fn builder_endpoint_overrides_env() {
        std::env::set_var("AZURE_ARM_ENDPOINT", "https://management.example.test");

        let client = test_client("https://explicit.example.test");
        assert_eq!(client.endpoint().as_str(), "https://explicit.example.test/");

        std::env::remove_var("AZURE_ARM_ENDPOINT");
    }

    #[test]
    fn builder_rejects_invalid_endpoint() {
        let result = ArmClient::builder()
            .endpoint("not a valid url")
            .credential(ArmCredential::bearer_token("test"))
            .build();

        assert!(matches!(result, Err(ArmError::InvalidEndpoint(_))));
    }

    #[test]
    fn url_joins_operation_path() {
        let client = test_client("https://management.azure.com");

        let url = client
            .url("/subscriptions/sub1/providers/Microsoft.Security/automations?api-version=2023-12-01-preview")
            .expect("should join");

        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/sub1/providers/Microsoft.Security/automations?api-version=2023-12-01-preview"
        );
    }

    #[test]
    fn client_is_cloneable() {
        let client = test_client("https://management.azure.com");
        let cloned = client.clone();
        assert_eq!(client.endpoint(), cloned.endpoint());
    }

    #[test]
    fn identifies_retriable_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(is_retriable_status(status), "{status} should be retriable");
        }
        for status in [200, 201, 204, 400, 401, 403, 404, 409] {
            assert!(!is_retriable_status(status), "{status} should not retry");
        }
    }

    #[test]
    fn truncates_oversized_error_bodies() {
        let msg = "x".repeat(5000);
        let truncated = ArmClient::truncate_message(&msg);
        assert!(truncated.len() < 1100);
        assert!(truncated.ends_with("... (truncated)"));

        let short = ArmClient::truncate_message("conflict");
        assert_eq!(short, "conflict");
    }

    // --- Wiremock round trips ---

    #[tokio::test]
    async fn get_sends_bearer_token_and_api_version_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub1/resourceGroups/rg1"))
            .and(query_param("api-version", "2021-04-01"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "rg1"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client
            .get("/subscriptions/sub1/resourceGroups/rg1?api-version=2021-04-01")
            .await
            .expect("should succeed");

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn put_sends_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/things/t1"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"properties": {"isEnabled": true}})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"name": "t1"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let body = serde_json::json!({"properties": {"isEnabled": true}});
        let response = client.put("/things/t1", &body).await.expect("should succeed");

        assert_eq!(response.status(), 201);
    }

    #[tokio::test]
    async fn arm_error_envelope_becomes_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": "ResourceNotFound", "message": "no such automation"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.get("/missing").await.unwrap_err();

        match err {
            ArmError::Api { code, message } => {
                assert_eq!(code, "ResourceNotFound");
                assert_eq!(message, "no such automation");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_envelope_error_becomes_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gateway"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.get("/gateway").await.unwrap_err();

        match err {
            ArmError::Http { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Forbidden");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_accepts_204_no_content() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/things/t1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client.delete("/things/t1").await.expect("should succeed");

        assert_eq!(response.status(), 204);
    }

    #[tokio::test]
    async fn accepts_202_accepted_as_success() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/lro"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client
            .put("/lro", &serde_json::json!({}))
            .await
            .expect("should succeed");

        assert_eq!(response.status(), 202);
    }

    #[tokio::test]
    async fn retries_on_503_then_succeeds() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let server = MockServer::start().await;
        let request_count = Arc::new(AtomicU32::new(0));
        let counter = request_count.clone();

        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(move |_req: &wiremock::Request| {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    ResponseTemplate::new(503).set_body_string("Service Unavailable")
                } else {
                    ResponseTemplate::new(200).set_body_string("OK")
                }
            })
            .mount(&server)
            .await;

        let client = ArmClient::builder()
            .endpoint(server.uri())
            .credential(ArmCredential::bearer_token("test"))
            .retry_policy(RetryPolicy {
                max_retries: 3,
                initial_backoff: Duration::from_millis(10),
            })
            .build()
            .expect("should build");

        let result = client.get("/flaky").await;
        assert!(result.is_ok(), "expected success after retries: {result:?}");
        assert_eq!(request_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let server = MockServer::start().await;
        let request_count = Arc::new(AtomicU32::new(0));
        let counter = request_count.clone();

        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(move |_req: &wiremock::Request| {
                counter.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(400).set_body_json(serde_json::json!({
                    "error": {"code": "BadRequest", "message": "nope"}
                }))
            })
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.get("/bad").await.unwrap_err();

        assert!(matches!(err, ArmError::Api { .. }));
        assert_eq!(request_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_absolute_follows_full_url() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/continuation"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = format!("{}/continuation", server.uri());
        let response = client.get_absolute(&url).await.expect("should succeed");

        assert_eq!(response.status(), 200);
    }
}
