//! HTTP server integration.
//!
//! [`UserwareApp`] combines a [`Routes`] table, a [`MiddlewarePipeline`] and
//! the [`Settings`] into an axum `Router`, or serves it directly.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use userware_core::Settings;
//! use userware_http::urls::path;
//! use userware_http::{HttpRequest, HttpResponse, Routes};
//! use userware_views::server::UserwareApp;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = Arc::new(|_req: HttpRequest| -> userware_http::BoxFuture {
//!     Box::pin(async { HttpResponse::ok("Hello!") })
//! });
//! let routes = Routes::new("/account/", vec![path("", handler, "home")?])?;
//!
//! let app = UserwareApp::new(Settings::default()).routes(routes);
//! app.run("127.0.0.1:8000").await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::response::IntoResponse;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use userware_core::logging::request_span;
use userware_core::{Settings, UserwareError};
use userware_http::{HttpRequest, HttpResponse, Routes};

use crate::middleware::{Middleware, MiddlewarePipeline, ViewHandler};

/// Largest request body the server will buffer.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// The account application: routes, middleware and settings.
pub struct UserwareApp {
    routes: Option<Routes>,
    middleware: MiddlewarePipeline,
    settings: Settings,
}

impl std::fmt::Debug for UserwareApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserwareApp")
            .field("routes", &self.routes)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

impl UserwareApp {
    /// Creates a new `UserwareApp` with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            routes: None,
            middleware: MiddlewarePipeline::new(),
            settings,
        }
    }

    /// Sets the route table.
    #[must_use]
    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Adds a middleware to the end of the pipeline.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.add(middleware);
        self
    }

    /// Returns the application settings.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns `true` if a route table has been set.
    pub const fn has_routes(&self) -> bool {
        self.routes.is_some()
    }

    /// Returns the number of middleware in the pipeline.
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Converts the application into an axum router.
    ///
    /// Every request runs through the middleware pipeline; unmatched paths
    /// answer 404 from inside the pipeline so sessions still apply.
    pub fn into_axum_router(self) -> axum::Router {
        let routes = Arc::new(self.routes);
        let middleware = Arc::new(self.middleware);

        let view_handler: Arc<ViewHandler> = Arc::new(Box::new(move |mut request: HttpRequest| {
            let routes = Arc::clone(&routes);
            Box::pin(async move {
                let Some(routes) = routes.as_ref() else {
                    return HttpResponse::server_error("No routes configured");
                };
                let Some((pattern, resolver_match)) = routes.resolve(request.path()) else {
                    return HttpResponse::not_found(format!("No route for {}", request.path()));
                };
                let callback = Arc::clone(pattern.callback());
                request.set_resolver_match(resolver_match);
                callback(request).await
            }) as userware_http::BoxFuture
        }));

        let handler = move |req: Request<Body>| {
            let middleware = Arc::clone(&middleware);
            let view_handler = Arc::clone(&view_handler);

            async move {
                let request_id = uuid::Uuid::new_v4().to_string();
                let span = request_span(&request_id, req.method().as_str(), req.uri().path());

                async move {
                    let (parts, body) = req.into_parts();
                    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
                        Ok(bytes) => bytes.to_vec(),
                        Err(e) => {
                            tracing::warn!(error = %e, "rejected request body");
                            return HttpResponse::bad_request("Request body too large")
                                .into_response();
                        }
                    };

                    let request = HttpRequest::from_axum(parts, body);
                    let response = middleware.process(request, &view_handler).await;
                    tracing::debug!(status = response.status().as_u16(), "request finished");
                    response.into_response()
                }
                .instrument(span)
                .await
            }
        };

        axum::Router::new()
            .fallback(handler)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the application as an HTTP server on the given address.
    pub async fn run(self, addr: &str) -> Result<(), UserwareError> {
        let router = self.into_axum_router();
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            UserwareError::ConfigurationError(format!("Failed to bind to {addr}: {e}"))
        })?;

        tracing::info!("Serving account routes at http://{addr}/");

        axum::serve(listener, router)
            .await
            .map_err(|e| UserwareError::InternalServerError(format!("Server error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;
    use userware_http::urls::path;

    fn routes() -> Routes {
        let login = Arc::new(|req: HttpRequest| -> userware_http::BoxFuture {
            Box::pin(async move {
                let name = req
                    .resolver_match()
                    .map(|m| m.url_name.clone())
                    .unwrap_or_default();
                HttpResponse::ok(name)
            })
        });
        let echo = Arc::new(|req: HttpRequest| -> userware_http::BoxFuture {
            Box::pin(async move {
                HttpResponse::ok(req.post().get("username").unwrap_or("").to_string())
            })
        });
        Routes::new(
            "/account/",
            vec![
                path("login/", login, "user_login").unwrap(),
                path("echo/", echo, "echo").unwrap(),
            ],
        )
        .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_builder() {
        let app = UserwareApp::new(Settings::default())
            .routes(routes())
            .middleware(crate::messages::MessagesMiddleware);
        assert!(app.has_routes());
        assert_eq!(app.middleware_count(), 1);
        assert_eq!(app.settings().mount_prefix, "/account/");
    }

    #[tokio::test]
    async fn test_router_resolves_named_route() {
        let router = UserwareApp::new(Settings::default())
            .routes(routes())
            .into_axum_router();
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/account/login/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(body_text(response).await, "user_login");
    }

    #[tokio::test]
    async fn test_router_parses_form_body() {
        let router = UserwareApp::new(Settings::default())
            .routes(routes())
            .into_axum_router();
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/account/echo/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("username=alice"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "alice");
    }

    #[tokio::test]
    async fn test_router_unknown_path_is_404() {
        let router = UserwareApp::new(Settings::default())
            .routes(routes())
            .into_axum_router();
        let response = router
            .oneshot(Request::builder().uri("/nope/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_router_without_routes_is_500() {
        let router = UserwareApp::new(Settings::default()).into_axum_router();
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
