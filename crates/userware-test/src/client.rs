//! HTTP test client.
//!
//! [`TestClient`] sends simulated requests to an axum router with
//! `tower::ServiceExt::oneshot` and keeps a cookie jar between them, so a
//! login on one request carries over to the next. [`TestResponse`] holds the
//! result.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use userware_auth::UserwareState;
//! use userware_core::Settings;
//! use userware_test::TestClient;
//!
//! async fn example() {
//!     let state = Arc::new(UserwareState::new(Settings::default()));
//!     let mut client = TestClient::for_state(&state).unwrap();
//!
//!     let response = client.get("/account/login/").await;
//!     assert_eq!(response.status_code(), 200);
//!     let body: serde_json::Value = response.json().unwrap();
//!     assert_eq!(body["form"], "user_authentication");
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use userware_auth::{build_app, UserwareState};
use userware_core::{UserwareError, UserwareResult};

/// Default host header sent with every request.
pub const TEST_HOST: &str = "testserver";

/// A cookie-carrying client for an axum application.
pub struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
    host: String,
}

impl TestClient {
    /// Creates a new test client wrapping the given router.
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: HashMap::new(),
            host: TEST_HOST.to_string(),
        }
    }

    /// Creates a client for the account application built over `state`.
    pub fn for_state(state: &Arc<UserwareState>) -> UserwareResult<Self> {
        Ok(Self::new(build_app(state)?.into_axum_router()))
    }

    /// Sends a GET request to the given path.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    /// Sends a POST request with url-encoded form data.
    pub async fn post(&mut self, path: &str, data: &[(&str, &str)]) -> TestResponse {
        let body = Self::encode_form_data(data);
        self.request(Method::POST, path, Some(body)).await
    }

    /// Sends a request with an arbitrary method and no body.
    pub async fn method(&mut self, method: Method, path: &str) -> TestResponse {
        self.request(method, path, None).await
    }

    /// Sets a cookie that will be included in subsequent requests.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    /// Returns the current value of a cookie in the jar.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Sets the host header sent with subsequent requests.
    pub fn set_host(&mut self, host: &str) {
        self.host = host.to_string();
    }

    /// Clears all cookies from the client.
    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    fn encode_form_data(data: &[(&str, &str)]) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(data)
            .finish()
    }

    /// Builds the Cookie header from the current cookie jar.
    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        let mut pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        pairs.sort_unstable();
        Some(pairs.join("; "))
    }

    async fn request(&mut self, method: Method, path: &str, body: Option<String>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(http::header::HOST, self.host.as_str());

        if body.is_some() {
            builder = builder.header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            );
        }

        if let Some(cookie) = self.cookie_header() {
            builder = builder.header(http::header::COOKIE, cookie);
        }

        let req = builder
            .body(body.map_or_else(axum::body::Body::empty, axum::body::Body::from))
            .expect("request builder should not fail");

        self.send(req).await
    }

    /// Sends the request through the router and updates the cookie jar.
    async fn send(&mut self, req: Request<axum::body::Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(req)
            .await
            .expect("router should not error");

        let status = response.status();
        let headers = response.headers().clone();

        let mut response_cookies = HashMap::new();
        for value in headers.get_all(http::header::SET_COOKIE) {
            let Ok(cookie_str) = value.to_str() else {
                continue;
            };
            let mut attributes = cookie_str.split(';');
            let Some((name, val)) = attributes.next().and_then(|pair| pair.split_once('=')) else {
                continue;
            };
            let name = name.trim().to_string();
            let val = val.trim().to_string();
            let expired = attributes.any(|attr| attr.trim().eq_ignore_ascii_case("max-age=0"));
            if expired || val.is_empty() {
                self.cookies.remove(&name);
            } else {
                self.cookies.insert(name.clone(), val.clone());
            }
            response_cookies.insert(name, val);
        }

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .map_or_else(|_| Bytes::new(), http_body_util::Collected::to_bytes);

        TestResponse {
            status,
            headers,
            body: body_bytes.to_vec(),
            cookies: response_cookies,
        }
    }
}

/// The response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body as raw bytes.
    pub body: Vec<u8>,
    /// Cookies set by the response, including deletions.
    pub cookies: HashMap<String, String>,
}

impl TestResponse {
    /// Returns the response body as a UTF-8 string.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Deserializes the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, UserwareError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| UserwareError::SerializationError(e.to_string()))
    }

    /// Returns the numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the value of a header by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the redirect target, if any.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    /// Returns `true` if the response body contains the given text.
    pub fn contains(&self, text: &str) -> bool {
        self.text().contains(text)
    }
}
