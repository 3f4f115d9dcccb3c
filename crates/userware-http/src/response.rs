//! HTTP response types.
//!
//! [`HttpResponse`] plus the [`JsonResponse`] and [`HttpResponseRedirect`]
//! helpers used by the account views.

use axum::response::IntoResponse;
use http::{HeaderMap, HeaderValue, StatusCode};

/// An HTTP response.
///
/// # Examples
///
/// ```
/// use userware_http::{HttpResponse, HttpResponseRedirect};
///
/// let response = HttpResponse::ok("Hello");
/// assert_eq!(response.status(), http::StatusCode::OK);
///
/// let redirect = HttpResponseRedirect::new("/account/login/");
/// assert_eq!(redirect.location(), Some("/account/login/"));
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    content: Vec<u8>,
    content_type: String,
}

impl HttpResponse {
    /// Creates a new `HttpResponse` with the given status code and text body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content: body.into().into_bytes(),
            content_type: "text/plain; charset=utf-8".to_string(),
        }
    }

    /// Creates a 200 OK response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Creates a 400 Bad Request response.
    pub fn bad_request(body: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, body)
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden(body: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, body)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, body)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error(body: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// Creates a 405 Method Not Allowed response listing the permitted methods.
    pub fn not_allowed(permitted_methods: &[&str]) -> Self {
        let allowed = permitted_methods.join(", ");
        let mut response = Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method Not Allowed. Permitted: {allowed}"),
        );
        if let Ok(value) = HeaderValue::from_str(&allowed) {
            response.headers.insert(http::header::ALLOW, value);
        }
        response
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the response headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Sets the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// Returns the body bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Returns the `Location` header of a redirect.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns `true` for 3xx responses.
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status, self.content).into_response();
        if let Ok(ct) = HeaderValue::from_str(&self.content_type) {
            response.headers_mut().insert(http::header::CONTENT_TYPE, ct);
        }
        for (key, value) in &self.headers {
            response.headers_mut().append(key, value.clone());
        }
        response
    }
}

/// A JSON response.
pub struct JsonResponse;

impl JsonResponse {
    /// Creates a 200 JSON response from a serializable value.
    ///
    /// Serialization failures produce a 500 response.
    pub fn new<T: serde::Serialize>(data: &T) -> HttpResponse {
        Self::with_status(StatusCode::OK, data)
    }

    /// Creates a JSON response with a custom status code.
    pub fn with_status<T: serde::Serialize>(status: StatusCode, data: &T) -> HttpResponse {
        match serde_json::to_string(data) {
            Ok(json) => {
                let mut response = HttpResponse::new(status, json);
                response.set_content_type("application/json");
                response
            }
            Err(e) => HttpResponse::server_error(format!("JSON serialization error: {e}")),
        }
    }
}

/// A 302 Found redirect.
pub struct HttpResponseRedirect;

impl HttpResponseRedirect {
    /// Creates a 302 Found redirect to the given URL.
    pub fn new(url: &str) -> HttpResponse {
        let mut response = HttpResponse::new(StatusCode::FOUND, "");
        if let Ok(value) = HeaderValue::from_str(url) {
            response.headers.insert(http::header::LOCATION, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(HttpResponse::ok("x").status(), StatusCode::OK);
        assert_eq!(HttpResponse::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(HttpResponse::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(HttpResponse::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            HttpResponse::server_error("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_allowed_sets_allow_header() {
        let response = HttpResponse::not_allowed(&["GET", "POST"]);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(http::header::ALLOW).unwrap(),
            "GET, POST"
        );
    }

    #[test]
    fn test_json_response() {
        let response = JsonResponse::new(&serde_json::json!({"form": "login"}));
        assert_eq!(response.content_type(), "application/json");
        assert_eq!(response.text(), r#"{"form":"login"}"#);
    }

    #[test]
    fn test_json_response_with_status() {
        let response =
            JsonResponse::with_status(StatusCode::BAD_REQUEST, &serde_json::json!({"errors": {}}));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_redirect() {
        let response = HttpResponseRedirect::new("/account/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.is_redirect());
        assert_eq!(response.location(), Some("/account/"));
    }

    #[test]
    fn test_into_response_keeps_headers() {
        let mut response = HttpResponseRedirect::new("/next/");
        response.headers_mut().append(
            http::header::SET_COOKIE,
            HeaderValue::from_static("sessionid=abc; Path=/"),
        );
        let axum_response = response.into_response();
        assert_eq!(axum_response.status(), StatusCode::FOUND);
        assert_eq!(axum_response.headers()[http::header::LOCATION], "/next/");
        assert!(axum_response.headers().contains_key(http::header::SET_COOKIE));
    }
}
