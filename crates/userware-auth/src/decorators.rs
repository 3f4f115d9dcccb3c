//! Route guards.
//!
//! Each guard wraps a [`RouteHandler`] and either short-circuits with a
//! response or forwards the request. They read the [`AuthContext`] left on
//! the request by the authentication middleware.

use std::sync::Arc;

use http::Method;

use userware_http::querydict::encode;
use userware_http::{BoxFuture, HttpRequest, HttpResponse, HttpResponseRedirect, RouteHandler};

use crate::middleware::AuthContext;

/// Answers 405 for any method not in `methods`. `HEAD` is accepted
/// wherever `GET` is.
pub fn require_http_methods(methods: &[Method], view: RouteHandler) -> RouteHandler {
    let methods: Arc<[Method]> = methods.into();
    Arc::new(move |request: HttpRequest| -> BoxFuture {
        let view = Arc::clone(&view);
        let methods = Arc::clone(&methods);
        Box::pin(async move {
            let method = request.method();
            let allowed = methods.contains(method)
                || (*method == Method::HEAD && methods.contains(&Method::GET));
            if allowed {
                view(request).await
            } else {
                let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
                HttpResponse::not_allowed(&names)
            }
        })
    })
}

/// Redirects anonymous requests to `login_url?next=<full path>`.
pub fn login_required(login_url: &str, view: RouteHandler) -> RouteHandler {
    let login_url = login_url.to_string();
    Arc::new(move |request: HttpRequest| -> BoxFuture {
        let view = Arc::clone(&view);
        let login_url = login_url.clone();
        Box::pin(async move {
            if AuthContext::from_request(&request).is_authenticated() {
                return view(request).await;
            }
            let separator = if login_url.contains('?') { '&' } else { '?' };
            let next = encode(&request.get_full_path());
            HttpResponseRedirect::new(&format!("{login_url}{separator}next={next}"))
        })
    })
}

/// Answers 403 unless the effective acting account is staff.
///
/// While impersonating a non-staff account the guard refuses, so a staff
/// member has to log in again to regain staff access.
pub fn staff_required(view: RouteHandler) -> RouteHandler {
    Arc::new(move |request: HttpRequest| -> BoxFuture {
        let view = Arc::clone(&view);
        Box::pin(async move {
            let is_staff = AuthContext::from_request(&request)
                .user()
                .is_some_and(|account| account.is_staff);
            if is_staff {
                view(request).await
            } else {
                tracing::warn!(path = %request.path(), "Staff-only route refused");
                HttpResponse::forbidden("Staff access required")
            }
        })
    })
}
