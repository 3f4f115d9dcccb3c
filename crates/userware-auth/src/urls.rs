//! The account route table.
//!
//! Routes are relative to the configured `mount_prefix`. The constants are
//! the route strings as passed to [`path`]; [`route_url`] turns a
//! placeholder-free one into an absolute path for redirects.

use std::future::Future;
use std::sync::Arc;

use http::Method;

use userware_core::{Settings, UserwareResult};
use userware_http::urls::path;
use userware_http::{BoxFuture, HttpRequest, HttpResponse, RouteHandler, Routes};

use crate::decorators::{login_required, require_http_methods, staff_required};
use crate::state::UserwareState;
use crate::views;

pub const ACCOUNT_REDIRECT: &str = "";
pub const LOGIN: &str = "login/";
pub const LOGOUT: &str = "logout/";
pub const PASSWORD_CHANGE: &str = "password/change/";
pub const DELETE_ACCOUNT: &str = "delete/";
pub const DISABLE_ACCOUNT: &str = "disable/";
pub const SWITCH_ON: &str = "switch/on/";
pub const RESET_REQUEST: &str = "password/reset/request/";
pub const RESET_REQUEST_SENT: &str = "password/reset/request/sent/";
pub const RESET_SET_NEW: &str = "password/reset/set/new/<uidb64:uidb64>-<token:token>/";
pub const RESET_COMPLETE: &str = "password/reset/complete/";
pub const PASSWORD_REQUEST: &str = "password/request/";

const GET: &[Method] = &[Method::GET];
const GET_POST: &[Method] = &[Method::GET, Method::POST];

/// Returns `mount_prefix` in the `/x/` form the route table uses.
pub fn mount_prefix(settings: &Settings) -> String {
    let trimmed = settings.mount_prefix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Absolute path of a route without placeholders.
pub fn route_url(settings: &Settings, route: &str) -> String {
    format!("{}{route}", mount_prefix(settings))
}

/// Absolute path of the set-new-password page for a reset link.
pub fn reset_confirm_path(settings: &Settings, uidb64: &str, token: &str) -> String {
    route_url(settings, &format!("password/reset/set/new/{uidb64}-{token}/"))
}

/// Adapts a view function into a route handler bound to `state`.
fn view<F, Fut>(state: &Arc<UserwareState>, view_fn: F) -> RouteHandler
where
    F: Fn(Arc<UserwareState>, HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    let state = Arc::clone(state);
    Arc::new(move |request: HttpRequest| -> BoxFuture { Box::pin(view_fn(Arc::clone(&state), request)) })
}

/// Builds the account routes under the configured mount prefix.
pub fn account_routes(state: &Arc<UserwareState>) -> UserwareResult<Routes> {
    let login_url = state.settings().login_url.clone();
    let guarded = |handler: RouteHandler| login_required(&login_url, handler);

    let patterns = vec![
        path(
            ACCOUNT_REDIRECT,
            guarded(require_http_methods(GET, view(state, views::account_redirect))),
            "user_account_redirect",
        )?,
        path(
            LOGIN,
            require_http_methods(GET_POST, view(state, views::login)),
            "user_login",
        )?,
        path(
            LOGOUT,
            require_http_methods(GET, view(state, views::logout)),
            "user_logout",
        )?,
        path(
            PASSWORD_CHANGE,
            guarded(require_http_methods(GET_POST, view(state, views::password_change))),
            "user_password_change",
        )?,
        path(
            DELETE_ACCOUNT,
            guarded(require_http_methods(GET_POST, view(state, views::delete_account))),
            "user_delete_account",
        )?,
        path(
            DISABLE_ACCOUNT,
            guarded(require_http_methods(GET_POST, view(state, views::disable_account))),
            "user_disable_account",
        )?,
        path(
            SWITCH_ON,
            guarded(staff_required(require_http_methods(
                GET_POST,
                view(state, views::switch_on),
            ))),
            "user_switch_on",
        )?,
        path(
            RESET_REQUEST,
            require_http_methods(GET_POST, view(state, views::password_reset_request)),
            "user_password_reset_request",
        )?,
        path(
            RESET_REQUEST_SENT,
            require_http_methods(GET, view(state, views::password_reset_request_sent)),
            "user_password_reset_request_sent",
        )?,
        path(
            RESET_SET_NEW,
            require_http_methods(GET_POST, view(state, views::password_reset_set_new)),
            "user_password_reset_set_new",
        )?,
        path(
            RESET_COMPLETE,
            require_http_methods(GET, view(state, views::password_reset_complete)),
            "user_password_reset_is_complete",
        )?,
        path(
            PASSWORD_REQUEST,
            guarded(require_http_methods(GET, view(state, views::password_request))),
            "user_password_request",
        )?,
    ];
    Routes::new(&state.settings().mount_prefix, patterns)
}
