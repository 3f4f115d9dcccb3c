//! HTTP request type.
//!
//! [`HttpRequest`] carries the method, path, headers, decoded GET/POST data
//! and a META map. Middleware attaches per-request state (the session handle,
//! the authentication context) through typed [`extensions`](HttpRequest::extensions).

use std::collections::HashMap;

use http::{Extensions, HeaderMap, Method};
use userware_core::{UserwareError, UserwareResult};

use crate::querydict::QueryDict;
use crate::urls::ResolverMatch;
use crate::utils::is_allowed_host;

/// An HTTP request.
///
/// Cloning a request clones its extensions, so shared handles stored there
/// (such as the session) are seen by every clone.
///
/// # Examples
///
/// ```
/// use userware_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .method(http::Method::POST)
///     .path("/account/login/")
///     .query_string("next=%2Fdashboard%2F")
///     .content_type("application/x-www-form-urlencoded")
///     .body(b"username=alice&password=Secret123".to_vec())
///     .build();
///
/// assert_eq!(request.get().get("next"), Some("/dashboard/"));
/// assert_eq!(request.post().get("username"), Some("alice"));
/// ```
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    get: QueryDict,
    post: QueryDict,
    headers: HeaderMap,
    meta: HashMap<String, String>,
    body: Vec<u8>,
    resolver_match: Option<ResolverMatch>,
    scheme: String,
    extensions: Extensions,
}

impl HttpRequest {
    /// Creates a new [`HttpRequestBuilder`].
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Creates an `HttpRequest` from Axum request parts and the collected body.
    pub fn from_axum(parts: http::request::Parts, body: Vec<u8>) -> Self {
        let mut builder = Self::builder()
            .method(parts.method)
            .path(parts.uri.path())
            .query_string(parts.uri.query().unwrap_or(""))
            .body(body);

        if let Some(ct) = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            builder = builder.content_type(ct);
        }

        let forwarded_https = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("https"));
        if forwarded_https || parts.uri.scheme_str() == Some("https") {
            builder = builder.scheme("https");
        }

        for (name, value) in &parts.headers {
            let meta_key = format!("HTTP_{}", name.as_str().to_uppercase().replace('-', "_"));
            if let Ok(v) = value.to_str() {
                builder = builder.meta(&meta_key, v);
            }
        }
        if let Some(host) = parts.uri.host() {
            let host = parts
                .uri
                .port_u16()
                .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
            builder = builder.meta("SERVER_NAME", &host);
        }

        let mut request = builder.build();
        request.headers = parts.headers;
        request.extensions = parts.extensions;
        request
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the decoded query string parameters.
    pub const fn get(&self) -> &QueryDict {
        &self.get
    }

    /// Returns the decoded form body parameters.
    pub const fn post(&self) -> &QueryDict {
        &self.post
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the META map.
    pub const fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

    /// Returns a mutable reference to the META map.
    pub fn meta_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.meta
    }

    /// Returns the raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the route match, once the route table has resolved this request.
    pub const fn resolver_match(&self) -> Option<&ResolverMatch> {
        self.resolver_match.as_ref()
    }

    /// Sets the route match on this request.
    pub fn set_resolver_match(&mut self, resolver_match: ResolverMatch) {
        self.resolver_match = Some(resolver_match);
    }

    /// Returns the typed per-request extensions.
    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns a mutable reference to the typed per-request extensions.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Returns the URL scheme (`"http"` or `"https"`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns `true` if the request uses HTTPS.
    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    /// Returns the host from the `Host` header, falling back to `SERVER_NAME`.
    pub fn get_host(&self) -> &str {
        self.headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.meta.get("SERVER_NAME").map(String::as_str))
            .unwrap_or("localhost")
    }

    /// Returns the host if it matches `allowed_hosts`.
    ///
    /// Anything built from the host and sent off-site, such as a reset link,
    /// must go through this rather than [`get_host`](Self::get_host).
    pub fn get_validated_host(&self, allowed_hosts: &[String]) -> UserwareResult<&str> {
        let host = self.get_host();
        if is_allowed_host(host, allowed_hosts) {
            Ok(host)
        } else {
            Err(UserwareError::SuspiciousOperation(format!(
                "Invalid Host header: '{host}'. Add it to allowed_hosts."
            )))
        }
    }

    /// Returns the path including the query string.
    pub fn get_full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    /// Builds an absolute URI for `location` on this request's host.
    pub fn build_absolute_uri(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            return location.to_string();
        }
        let path = if location.starts_with('/') {
            location.to_string()
        } else {
            format!("/{location}")
        };
        format!("{}://{}{path}", self.scheme, self.get_host())
    }

    /// Returns the value of the named cookie from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

/// A builder for constructing [`HttpRequest`] instances, mainly in tests.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    headers: HeaderMap,
    meta: HashMap<String, String>,
    body: Vec<u8>,
    scheme: String,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            content_type: None,
            headers: HeaderMap::new(),
            meta: HashMap::new(),
            body: Vec::new(),
            scheme: "http".to_string(),
        }
    }
}

impl HttpRequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the raw query string.
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Adds a META entry.
    #[must_use]
    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.meta.insert(key.to_string(), value.to_string());
        self
    }

    /// Sets the body bytes.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets a form-encoded body and the matching content type.
    #[must_use]
    pub fn form(self, data: &QueryDict) -> Self {
        self.content_type("application/x-www-form-urlencoded")
            .body(data.urlencode().into_bytes())
    }

    /// Sets the URL scheme.
    #[must_use]
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Builds the [`HttpRequest`].
    pub fn build(self) -> HttpRequest {
        let get = QueryDict::parse(&self.query_string);
        let post = if self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        {
            QueryDict::parse(&String::from_utf8_lossy(&self.body))
        } else {
            QueryDict::new()
        };

        let mut meta = self.meta;
        meta.entry("REQUEST_METHOD".to_string())
            .or_insert_with(|| self.method.to_string());
        meta.entry("PATH_INFO".to_string())
            .or_insert_with(|| self.path.clone());
        meta.entry("QUERY_STRING".to_string())
            .or_insert_with(|| self.query_string.clone());

        HttpRequest {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            content_type: self.content_type,
            get,
            post,
            headers: self.headers,
            meta,
            body: self.body,
            resolver_match: None,
            scheme: self.scheme,
            extensions: Extensions::new(),
        }
    }
}
