//! Middleware framework.
//!
//! This module provides the [`Middleware`] trait and [`MiddlewarePipeline`] for
//! processing requests and responses. Middleware components can intercept
//! requests before they reach the view and responses before they are sent to
//! the client.
//!
//! ## Execution Order
//!
//! Middleware is processed in order for requests (first added = first to
//! process) and in reverse order for responses (first added = last to
//! process). The account stack is assembled as session, authentication,
//! user switch, messages.

use async_trait::async_trait;

use userware_http::{BoxFuture, HttpRequest, HttpResponse};

/// The type for an async view handler function used in the pipeline.
pub type ViewHandler = Box<dyn Fn(HttpRequest) -> BoxFuture + Send + Sync>;

/// A middleware component that can process requests and responses.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use userware_views::middleware::{Middleware, MiddlewarePipeline};
/// use userware_http::{HttpRequest, HttpResponse};
///
/// struct RequestIdMiddleware;
///
/// #[async_trait]
/// impl Middleware for RequestIdMiddleware {
///     async fn process_request(&self, request: &mut HttpRequest) -> Option<HttpResponse> {
///         request.meta_mut().insert("REQUEST_ID".into(), "1".into());
///         None
///     }
/// }
///
/// let mut pipeline = MiddlewarePipeline::new();
/// pipeline.add(RequestIdMiddleware);
/// assert_eq!(pipeline.len(), 1);
/// ```
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process an incoming request before it reaches the view.
    ///
    /// Return `Some(HttpResponse)` to short-circuit the pipeline and skip the
    /// view. Return `None` to allow the request to continue.
    async fn process_request(&self, request: &mut HttpRequest) -> Option<HttpResponse>;

    /// Process the response after the view has been called.
    ///
    /// Called in reverse middleware order.
    async fn process_response(
        &self,
        _request: &HttpRequest,
        response: HttpResponse,
    ) -> HttpResponse {
        response
    }
}

/// A pipeline of middleware components that processes requests and responses.
pub struct MiddlewarePipeline {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl Default for MiddlewarePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl MiddlewarePipeline {
    /// Creates a new empty middleware pipeline.
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Adds a middleware to the end of the pipeline.
    pub fn add(&mut self, middleware: impl Middleware + 'static) {
        self.middlewares.push(Box::new(middleware));
    }

    /// Returns the number of middleware components in the pipeline.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if the pipeline has no middleware components.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Processes a request through the full middleware pipeline and view handler.
    ///
    /// 1. Calls `process_request` on each middleware in order. If any returns
    ///    `Some(response)`, short-circuits and runs `process_response` in reverse
    ///    on only the middleware that already ran.
    /// 2. Calls the view handler with a clone of the request. Extensions hold
    ///    shared handles, so the clone and the original see the same session.
    /// 3. Calls `process_response` on each middleware in reverse order.
    pub async fn process(&self, mut request: HttpRequest, handler: &ViewHandler) -> HttpResponse {
        for (i, mw) in self.middlewares.iter().enumerate() {
            if let Some(response) = mw.process_request(&mut request).await {
                let mut resp = response;
                for earlier in self.middlewares[..=i].iter().rev() {
                    resp = earlier.process_response(&request, resp).await;
                }
                return resp;
            }
        }

        let mut resp = handler(request.clone()).await;

        for mw in self.middlewares.iter().rev() {
            resp = mw.process_response(&request, resp).await;
        }
        resp
    }
}

impl std::fmt::Debug for MiddlewarePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewarePipeline")
            .field("middleware_count", &self.middlewares.len())
            .finish()
    }
}
