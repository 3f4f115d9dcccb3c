//! Account views.
//!
//! Every view takes the shared [`UserwareState`] and the request, and
//! answers with JSON or a redirect:
//!
//! - a GET describes the form: `{"form", "fields", "messages"}`
//! - an invalid POST answers 400 with `{"form", "errors", "messages"}`
//! - a successful POST redirects
//!
//! Method and login guards are applied when the routes are built, see
//! [`crate::urls`]. Views that change an account act on the effective
//! acting account, which differs from the logged-in principal while a
//! staff member is switched.

use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::{json, Value};

use userware_core::UserwareError;
use userware_forms::Form;
use userware_http::utils::is_safe_url;
use userware_http::{HttpRequest, HttpResponse, HttpResponseRedirect, JsonResponse};
use userware_views::{Message, Messages, Session};

use crate::account::Account;
use crate::forms::{
    UserAuthenticationForm, UserDeletionForm, UserDisableForm, UserPasswordChangeForm,
    UserPasswordResetForm, UserSetPasswordForm, UserSwitchForm,
};
use crate::middleware::AuthContext;
use crate::notify;
use crate::session_auth;
use crate::signals::UserSwitchedOn;
use crate::state::UserwareState;
use crate::switch;
use crate::tokens::decode_uid;
use crate::urls::{self, route_url};

const PASSWORD_CHANGE_WARNING: &str =
    "Changing your password will log you out of all of your other sessions.";
const DELETE_WARNING: &str =
    "This is extremely important. If you delete your account, there is no going back.";
const DISABLE_WARNING: &str =
    "This is extremely important. If you disable your account, there is no going back.";
const SWITCH_WARNING: &str =
    "To switch back to a privileged user, you must re-login. This is done for security reasons.";
const INVALID_RESET_LINK: &str =
    "The password reset link was invalid, possibly because it has already been used.";

// ── Helpers ──────────────────────────────────────────────────────────

fn session_of(request: &HttpRequest) -> Session {
    Session::from_request(request).unwrap_or_else(|| {
        tracing::warn!("No session on request; changes will not persist");
        Session::detached()
    })
}

fn messages_of(request: &HttpRequest) -> Messages {
    Messages::from_request(request).unwrap_or_else(|| Messages::new(Session::detached()))
}

fn drain_messages(request: &HttpRequest) -> Vec<Message> {
    messages_of(request).get_messages()
}

fn is_get(request: &HttpRequest) -> bool {
    matches!(*request.method(), Method::GET | Method::HEAD)
}

/// The effective acting account. Guarded routes always have one.
fn acting_account(request: &HttpRequest) -> Option<Account> {
    AuthContext::from_request(request).user().cloned()
}

fn form_page<F: Form + ?Sized>(form: &F, request: &HttpRequest) -> HttpResponse {
    let mut body = form.as_json();
    body["messages"] = json!(drain_messages(request));
    JsonResponse::new(&body)
}

fn form_errors<F: Form + ?Sized>(form: &F, request: &HttpRequest) -> HttpResponse {
    JsonResponse::with_status(
        StatusCode::BAD_REQUEST,
        &json!({
            "form": form.name(),
            "errors": form.errors(),
            "messages": drain_messages(request),
        }),
    )
}

fn page(name: &str, request: &HttpRequest, extra: Value) -> HttpResponse {
    let mut body = json!({ "page": name, "messages": drain_messages(request) });
    if let (Value::Object(body), Value::Object(extra)) = (&mut body, extra) {
        body.extend(extra);
    }
    JsonResponse::new(&body)
}

/// Answers a failed operation with the error's status. Server-side details
/// stay in the log.
fn error_response(error: &UserwareError) -> HttpResponse {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if error.is_client_error() {
        tracing::warn!(error = %error, status = status.as_u16(), "Account view rejected request");
        JsonResponse::with_status(status, &json!({ "error": error.to_string() }))
    } else {
        tracing::error!(error = %error, "Account view failed");
        HttpResponse::server_error("Internal server error")
    }
}

fn anonymous_guarded() -> HttpResponse {
    HttpResponse::server_error("Guarded view reached without an account")
}

// ── Redirect ─────────────────────────────────────────────────────────

/// `GET /` under the mount prefix: sends signed-in users on.
pub async fn account_redirect(state: Arc<UserwareState>, _request: HttpRequest) -> HttpResponse {
    HttpResponseRedirect::new(&state.settings().login_redirect_url)
}

// ── Login / logout ───────────────────────────────────────────────────

pub async fn login(state: Arc<UserwareState>, request: HttpRequest) -> HttpResponse {
    let settings = state.settings();
    let mut form = UserAuthenticationForm::new(Arc::clone(&state));

    if is_get(&request) {
        if AuthContext::from_request(&request).is_authenticated() {
            return HttpResponseRedirect::new(&settings.login_redirect_url);
        }
        return form_page(&form, &request);
    }

    form.bind(request.post());
    if !form.is_valid().await {
        return form_errors(&form, &request);
    }
    let Some(mut account) = form.take_user() else {
        return anonymous_guarded();
    };

    let session = session_of(&request);
    if let Err(e) = session_auth::login(&state, &session, &mut account).await {
        return error_response(&e);
    }
    messages_of(&request).success(format!(
        "You are now logged in as \"{}\" ( {} ).",
        account.username, account.email
    ));

    let next = request
        .get()
        .get("next")
        .or_else(|| request.post().get("next"))
        .filter(|target| is_safe_url(target, request.get_host()));
    HttpResponseRedirect::new(next.unwrap_or(&settings.login_redirect_url))
}

/// Ends the session, which also ends any switch.
pub async fn logout(state: Arc<UserwareState>, request: HttpRequest) -> HttpResponse {
    let session = session_of(&request);
    if switch::switch_off(&state, &session) {
        tracing::debug!("Switch cleared on logout");
    }
    if AuthContext::from_request(&request).is_authenticated() {
        session_auth::logout(&session);
        messages_of(&request).success("You are now logged out.");
    }
    HttpResponseRedirect::new(&state.settings().logout_redirect_url)
}

// ── Password change ──────────────────────────────────────────────────

pub async fn password_change(state: Arc<UserwareState>, request: HttpRequest) -> HttpResponse {
    let Some(account) = acting_account(&request) else {
        return anonymous_guarded();
    };
    let messages = messages_of(&request);
    let mut form = UserPasswordChangeForm::new(Arc::clone(&state), account);

    if is_get(&request) {
        if !messages.has_pending() {
            messages.warning(PASSWORD_CHANGE_WARNING);
        }
        return form_page(&form, &request);
    }

    form.bind(request.post());
    if !form.is_valid().await {
        messages.warning(PASSWORD_CHANGE_WARNING);
        return form_errors(&form, &request);
    }
    let account = match form.save().await {
        Ok(account) => account,
        Err(e) => return error_response(&e),
    };

    let session = session_of(&request);
    session_auth::update_session_auth_hash(&state, &session, &account);
    let current = session.session_key();
    if let Err(e) = session_auth::force_logout_others(&state, &account, Some(&current)).await {
        tracing::error!(account_id = account.id, error = %e, "Failed to invalidate other sessions");
    }
    messages.success("Your password was changed.");
    HttpResponseRedirect::new(&state.settings().login_redirect_url)
}

// ── Delete / disable ─────────────────────────────────────────────────

pub async fn delete_account(state: Arc<UserwareState>, request: HttpRequest) -> HttpResponse {
    let Some(account) = acting_account(&request) else {
        return anonymous_guarded();
    };
    let messages = messages_of(&request);
    let mut form = UserDeletionForm::new(Arc::clone(&state), account);

    if is_get(&request) {
        messages.warning(DELETE_WARNING);
        return form_page(&form, &request);
    }

    form.bind(request.post());
    if !form.is_valid().await {
        messages.warning(DELETE_WARNING);
        return form_errors(&form, &request);
    }
    if let Err(e) = form.delete().await {
        return error_response(&e);
    }
    session_auth::logout(&session_of(&request));
    messages.success(format!(
        "Account '{}' was permanently deleted. Sorry to see you go!",
        form.account().username
    ));
    HttpResponseRedirect::new("/")
}

pub async fn disable_account(state: Arc<UserwareState>, request: HttpRequest) -> HttpResponse {
    let Some(account) = acting_account(&request) else {
        return anonymous_guarded();
    };
    let messages = messages_of(&request);
    let mut form = UserDisableForm::new(Arc::clone(&state), account);

    if is_get(&request) {
        messages.warning(DISABLE_WARNING);
        return form_page(&form, &request);
    }

    form.bind(request.post());
    if !form.is_valid().await {
        messages.warning(DISABLE_WARNING);
        return form_errors(&form, &request);
    }
    let account = match form.disable().await {
        Ok(account) => account,
        Err(e) => return error_response(&e),
    };
    session_auth::logout(&session_of(&request));
    messages.success(format!(
        "Account '{}' was permanently disabled. Sorry to see you go!",
        account.username
    ));
    HttpResponseRedirect::new("/")
}

// ── Switch ───────────────────────────────────────────────────────────

/// Starts acting as another account. Staff only.
pub async fn switch_on(state: Arc<UserwareState>, request: HttpRequest) -> HttpResponse {
    let messages = messages_of(&request);
    let mut form = UserSwitchForm::new(Arc::clone(&state));

    if is_get(&request) {
        if !messages.has_pending() {
            messages.warning(SWITCH_WARNING);
        }
        return form_page(&form, &request);
    }

    form.bind(request.post());
    if !form.is_valid().await {
        return form_errors(&form, &request);
    }
    let Some(username) = form.switched_username().map(ToString::to_string) else {
        return anonymous_guarded();
    };
    let Some(principal) = AuthContext::from_request(&request).principal().cloned() else {
        return anonymous_guarded();
    };

    switch::switch_on(&state, &session_of(&request), &username);
    messages.success(format!("switched to user '{username}'"));
    tracing::warn!(
        principal_id = principal.id,
        principal = %principal.username,
        target = %username,
        "User switched on"
    );
    state.signals().user_switched_on.send(&UserSwitchedOn {
        sender: principal,
        switched_username: username,
    });
    HttpResponseRedirect::new(&state.settings().login_redirect_url)
}

// ── Password reset ───────────────────────────────────────────────────

pub async fn password_reset_request(
    state: Arc<UserwareState>,
    request: HttpRequest,
) -> HttpResponse {
    let mut form = UserPasswordResetForm::new(Arc::clone(&state));
    if is_get(&request) {
        return form_page(&form, &request);
    }

    form.bind(request.post());
    if !form.is_valid().await {
        return form_errors(&form, &request);
    }
    if let Err(e) = form.save(&request).await {
        return error_response(&e);
    }
    HttpResponseRedirect::new(&route_url(state.settings(), urls::RESET_REQUEST_SENT))
}

pub async fn password_reset_request_sent(
    _state: Arc<UserwareState>,
    request: HttpRequest,
) -> HttpResponse {
    page("password_reset_request_sent", &request, json!({}))
}

pub async fn password_reset_complete(
    state: Arc<UserwareState>,
    request: HttpRequest,
) -> HttpResponse {
    page(
        "password_reset_complete",
        &request,
        json!({ "login_url": state.settings().login_url }),
    )
}

/// Finds the account a reset link was issued for, if the link still holds.
async fn reset_link_account(state: &UserwareState, request: &HttpRequest) -> Option<Account> {
    let kwargs = &request.resolver_match()?.kwargs;
    let id = decode_uid(kwargs.get("uidb64")?)?;
    let token = kwargs.get("token")?;
    let account = match state.directory().get_by_id(id).await {
        Ok(account) => account?,
        Err(e) => {
            tracing::error!(account_id = id, error = %e, "Reset link lookup failed");
            return None;
        }
    };
    state
        .token_generator()
        .check_token(&account, token)
        .then_some(account)
}

pub async fn password_reset_set_new(
    state: Arc<UserwareState>,
    request: HttpRequest,
) -> HttpResponse {
    let Some(account) = reset_link_account(&state, &request).await else {
        tracing::warn!(path = %request.path(), "Invalid password reset link");
        return JsonResponse::with_status(
            StatusCode::BAD_REQUEST,
            &json!({ "validlink": false, "error": INVALID_RESET_LINK }),
        );
    };
    let mut form = UserSetPasswordForm::new(Arc::clone(&state), account);

    if is_get(&request) {
        let mut body = form.as_json();
        body["validlink"] = json!(true);
        body["messages"] = json!(drain_messages(&request));
        return JsonResponse::new(&body);
    }

    form.bind(request.post());
    if !form.is_valid().await {
        return form_errors(&form, &request);
    }
    let account = match form.save().await {
        Ok(account) => account,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = session_auth::force_logout_others(&state, &account, None).await {
        tracing::error!(account_id = account.id, error = %e, "Failed to invalidate sessions");
    }
    HttpResponseRedirect::new(&route_url(state.settings(), urls::RESET_COMPLETE))
}

/// Sends a reset link to the signed-in account's own email.
pub async fn password_request(state: Arc<UserwareState>, request: HttpRequest) -> HttpResponse {
    let Some(account) = acting_account(&request) else {
        return anonymous_guarded();
    };
    if let Err(e) = notify::send_reset_link(&state, &request, &account).await {
        return error_response(&e);
    }
    HttpResponseRedirect::new(&route_url(state.settings(), urls::RESET_REQUEST_SENT))
}
