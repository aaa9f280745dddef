//! Fake-server machinery for testing generated clients.
//!
//! Service crates pair every client with a fake server: a table of
//! per-operation handler functions dispatched by regex-matching the request
//! path, mounted on a [`wiremock::MockServer`] as a catch-all responder so
//! the real [`ArmClient`](crate::client::ArmClient) pipeline is exercised
//! end to end. This module provides the shared routing layer those fakes
//! build on; the typed handler tables live in each service crate's `fake`
//! module.
//!
//! Only compiled with the `test-support` feature; intended for tests.
//!
//! # Examples
//!
//! ```rust,ignore
//! use azure_arm_core::fake::{serve, FakeResponse, FakeRouter};
//!
//! let router = FakeRouter::new().route(
//!     "GET",
//!     r"^/subscriptions/([^/]+)/widgets/([^/]+)$",
//!     |req| FakeResponse::json(200, serde_json::json!({"name": req.capture(1)})),
//! );
//!
//! let server = serve(router).await;
//! // point an ArmClient at server.uri() ...
//! ```

use bytes::Bytes;
use regex::Regex;
use url::Url;
use wiremock::matchers::any;
use wiremock::{Mock, Request, Respond, ResponseTemplate};

use crate::models::ErrorResponse;

// Re-exported so service fakes can name the server type without depending
// on wiremock themselves.
pub use wiremock::MockServer;

/// A request as seen by a fake route handler.
pub struct FakeRequest {
    /// Uppercase HTTP method.
    pub method: String,
    /// The full request URL, including the live server origin.
    pub url: Url,
    /// The request path the route pattern matched against.
    pub path: String,
    /// The regex capture groups of the matched route, in order.
    pub captures: Vec<String>,
    /// Raw request body.
    pub body: Bytes,
}

impl FakeRequest {
    /// The value of the route's `index`-th capture group (0-based).
    ///
    /// # Panics
    ///
    /// Panics if the route pattern has no such group; fakes treat that as a
    /// broken route table, not a runtime condition.
    pub fn capture(&self, index: usize) -> &str {
        self.captures
            .get(index)
            .map(String::as_str)
            .expect("route pattern is missing a capture group")
    }

    /// The first value of a query parameter, if present.
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Deserialize the request body as JSON.
    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// A canned response produced by a fake route handler.
pub struct FakeResponse {
    status: u16,
    body: Option<serde_json::Value>,
    headers: Vec<(String, String)>,
}

impl FakeResponse {
    /// A JSON response.
    ///
    /// # Panics
    ///
    /// Panics if the body does not serialize; fake bodies are built from
    /// the SDK's own DTOs, so this indicates a broken test.
    pub fn json(status: u16, body: impl serde::Serialize) -> Self {
        Self {
            status,
            body: Some(serde_json::to_value(body).expect("fake response body serializes")),
            headers: Vec::new(),
        }
    }

    /// A bodyless response (e.g. 204, 202).
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: None,
            headers: Vec::new(),
        }
    }

    /// An ARM error envelope response.
    pub fn error(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::json(status, ErrorResponse::new(code, message))
    }

    /// Attach a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn into_template(self) -> ResponseTemplate {
        let mut template = ResponseTemplate::new(self.status);
        if let Some(body) = self.body {
            template = template.set_body_json(body);
        }
        for (name, value) in self.headers {
            template = template.insert_header(name.as_str(), value.as_str());
        }
        template
    }
}

/// An error a fake handler returns; rendered as an ARM error envelope.
#[derive(Debug, Clone)]
pub struct FakeError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl FakeError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// A 404 with the standard ARM `ResourceNotFound` code.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "ResourceNotFound", message)
    }
}

/// What a typed fake handler returns.
pub type FakeResult<T> = Result<T, FakeError>;

impl From<FakeError> for FakeResponse {
    fn from(e: FakeError) -> Self {
        FakeResponse::error(e.status, e.code, e.message)
    }
}

/// Render a handler result: the `Ok` value as a JSON body with `status`,
/// the `Err` as an ARM error envelope.
pub fn result_response<T: serde::Serialize>(status: u16, result: FakeResult<T>) -> FakeResponse {
    match result {
        Ok(value) => FakeResponse::json(status, value),
        Err(e) => e.into(),
    }
}

/// Render a list page returned by a fake handler.
///
/// A handler signals "more pages" by setting the page's `next_link` to an
/// opaque continuation token; this rewrites it into an absolute `nextLink`
/// against the live server origin, carrying the request's `api-version`
/// and the token as `$skipToken`. The paired list route reads the token
/// back via `req.query("$skipToken")`.
pub fn page_response<T: serde::Serialize>(
    req: &FakeRequest,
    result: FakeResult<crate::paging::Page<T>>,
) -> FakeResponse {
    let page = match result {
        Ok(page) => page,
        Err(e) => return e.into(),
    };

    let mut body = serde_json::json!({ "value": page.value });
    if let Some(token) = page.next_link {
        let origin = req.url.origin().ascii_serialization();
        let api_version = req.query("api-version").unwrap_or_default();
        body["nextLink"] = serde_json::Value::String(format!(
            "{origin}{}?api-version={api_version}&$skipToken={token}",
            req.path
        ));
    }
    FakeResponse::json(200, body)
}

/// The response for an operation whose fake handler is not wired.
pub fn not_implemented(operation: &str) -> FakeResponse {
    FakeResponse::error(
        500,
        "NotImplemented",
        format!("fake for {operation} is not implemented"),
    )
}

type FakeHandler = Box<dyn Fn(&FakeRequest) -> FakeResponse + Send + Sync>;

struct Route {
    method: String,
    pattern: Regex,
    handler: FakeHandler,
}

/// An ordered table of `(method, path regex, handler)` routes.
///
/// The first route whose method and pattern both match wins; a pattern
/// match with the wrong method falls through. An unmatched request gets a
/// 404 with an ARM-style error body, so a client test failure reads as a
/// missing route rather than a hung connection.
#[derive(Default)]
pub struct FakeRouter {
    routes: Vec<Route>,
}

impl FakeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex; route tables are written
    /// by hand in fakes and a bad pattern is a bug there.
    pub fn route(
        mut self,
        method: &str,
        pattern: &str,
        handler: impl Fn(&FakeRequest) -> FakeResponse + Send + Sync + 'static,
    ) -> Self {
        self.routes.push(Route {
            method: method.to_ascii_uppercase(),
            pattern: Regex::new(pattern).expect("fake route pattern compiles"),
            handler: Box::new(handler),
        });
        self
    }
}

impl Respond for FakeRouter {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let method = request.method.to_string().to_ascii_uppercase();
        let path = request.url.path().to_string();

        // Clients send origin-form request targets (path only), so wiremock
        // reconstructs `request.url` against a fixed `http://localhost` base,
        // losing the server's real authority. Restore it from the `Host`
        // header so handlers can build absolute callback URLs
        // (`Azure-AsyncOperation`, `nextLink`) that point back at this server.
        let mut request_url = request.url.clone();
        if let Some(host) = request.headers.get("host").and_then(|h| h.to_str().ok()) {
            let (host, port) = match host.rsplit_once(':') {
                Some((h, p)) => (h, p.parse::<u16>().ok()),
                None => (host, None),
            };
            let _ = request_url.set_host(Some(host));
            let _ = request_url.set_port(port);
        }

        for route in &self.routes {
            if route.method != method {
                continue;
            }
            let Some(caps) = route.pattern.captures(&path) else {
                continue;
            };

            let captures = caps
                .iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect();

            let fake_request = FakeRequest {
                method,
                url: request_url,
                path,
                captures,
                body: Bytes::from(request.body.clone()),
            };

            return (route.handler)(&fake_request).into_template();
        }

        FakeResponse::error(404, "NotFound", format!("no fake route for {method} {path}"))
            .into_template()
    }
}

/// Mount the router on a fresh mock server and return it.
///
/// The server lives until dropped; point an
/// [`ArmClient`](crate::client::ArmClient) at `server.uri()`.
pub async fn serve(router: FakeRouter) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(any()).respond_with(router).mount(&server).await;
    server
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ArmCredential;
    use crate::client::ArmClient;
    use crate::error::ArmError;

    async fn setup_client(server: &MockServer) -> ArmClient {
        ArmClient::builder()
            .endpoint(server.uri())
            .credential(ArmCredential::bearer_token("test-token"))
            .build()
            .expect("should build client")
    }

    #[tokio::test]
    async fn routes_by_method_and_pattern_with_captures() {
        let router = FakeRouter::new()
            .route("GET", r"^/widgets/([^/]+)$", |req| {
                FakeResponse::json(200, serde_json::json!({"name": req.capture(0)}))
            })
            .route("DELETE", r"^/widgets/([^/]+)$", |_req| {
                FakeResponse::empty(204)
            });

        let server = serve(router).await;
        let client = setup_client(&server).await;

        let response = client.get("/widgets/w1").await.expect("get");
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["name"], "w1");

        let response = client.delete("/widgets/w1").await.expect("delete");
        assert_eq!(response.status(), 204);
    }

    #[tokio::test]
    async fn unmatched_request_gets_arm_style_404() {
        let server = serve(FakeRouter::new()).await;
        let client = setup_client(&server).await;

        let err = client.get("/nothing/here").await.unwrap_err();
        match err {
            ArmError::Api { code, message } => {
                assert_eq!(code, "NotFound");
                assert!(message.contains("GET /nothing/here"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let router = FakeRouter::new()
            .route("GET", r"^/widgets/special$", |_req| {
                FakeResponse::json(200, serde_json::json!({"kind": "special"}))
            })
            .route("GET", r"^/widgets/([^/]+)$", |_req| {
                FakeResponse::json(200, serde_json::json!({"kind": "plain"}))
            });

        let server = serve(router).await;
        let client = setup_client(&server).await;

        let body: serde_json::Value = client
            .get("/widgets/special")
            .await
            .expect("get")
            .json()
            .await
            .unwrap();
        assert_eq!(body["kind"], "special");
    }

    #[tokio::test]
    async fn handler_sees_query_and_body() {
        let router = FakeRouter::new().route("PUT", r"^/widgets/([^/]+)$", |req| {
            assert_eq!(req.query("api-version").as_deref(), Some("2021-04-01"));
            let body: serde_json::Value = req.body_json().expect("json body");
            FakeResponse::json(200, serde_json::json!({"echo": body["payload"]}))
        });

        let server = serve(router).await;
        let client = setup_client(&server).await;

        let body: serde_json::Value = client
            .put(
                "/widgets/w9?api-version=2021-04-01",
                &serde_json::json!({"payload": 42}),
            )
            .await
            .expect("put")
            .json()
            .await
            .unwrap();
        assert_eq!(body["echo"], 42);
    }
}
