//! Authentication middleware and the per-request [`AuthContext`].

use std::sync::Arc;

use async_trait::async_trait;

use userware_http::{HttpRequest, HttpResponse};
use userware_views::{Middleware, Session};

use crate::account::Account;
use crate::session_auth;
use crate::state::UserwareState;

/// Who is making the request.
///
/// `principal` is the account logged in to the session. `acting` is set
/// while a staff member impersonates another account; it is the identity
/// used for authorization checks.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub principal: Option<Account>,
    pub acting: Option<Account>,
}

impl AuthContext {
    /// An anonymous context.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A context for a logged-in account that is not impersonating anyone.
    pub const fn authenticated(account: Account) -> Self {
        Self {
            principal: Some(account),
            acting: None,
        }
    }

    /// Returns the context attached to `request`, or an anonymous one.
    pub fn from_request(request: &HttpRequest) -> Self {
        request.extensions().get::<Self>().cloned().unwrap_or_default()
    }

    /// The effective acting account.
    pub fn user(&self) -> Option<&Account> {
        self.acting.as_ref().or(self.principal.as_ref())
    }

    /// The account logged in to the session.
    pub const fn principal(&self) -> Option<&Account> {
        self.principal.as_ref()
    }

    pub const fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Returns `true` while impersonating another account.
    pub const fn is_switched(&self) -> bool {
        self.acting.is_some()
    }
}

/// Resolves the logged-in account from the session and attaches an
/// [`AuthContext`] to the request. Must run after the session middleware.
pub struct AuthenticationMiddleware {
    state: Arc<UserwareState>,
}

impl AuthenticationMiddleware {
    pub fn new(state: Arc<UserwareState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Middleware for AuthenticationMiddleware {
    async fn process_request(&self, request: &mut HttpRequest) -> Option<HttpResponse> {
        let context = match Session::from_request(request) {
            Some(session) => session_auth::get_user_from_session(&self.state, &session)
                .await
                .map_or_else(AuthContext::anonymous, AuthContext::authenticated),
            None => {
                tracing::warn!("AuthenticationMiddleware needs SessionMiddleware to run first");
                AuthContext::anonymous()
            }
        };
        request.extensions_mut().insert(context);
        None
    }
}
