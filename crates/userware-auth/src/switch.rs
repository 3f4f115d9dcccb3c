//! Staff impersonation ("switch user").
//!
//! A switch is nothing more than the target's username stored in the
//! session under the configured `switched_user_key`. [`UserSwitchMiddleware`] resolves it
//! on every request and, when it names an account, makes that account the
//! effective acting identity. An identifier that no longer resolves leaves
//! the real principal in effect. Only logout removes the key.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use userware_http::{HttpRequest, HttpResponse};
use userware_views::{Middleware, Session};

use crate::middleware::AuthContext;
use crate::resolver;
use crate::state::UserwareState;

/// Returns the identifier this session is switched to, if any.
pub fn switched_identifier(state: &UserwareState, session: &Session) -> Option<String> {
    session.get_str(&state.settings().userware.switched_user_key)
}

/// Records a switch to `identifier`, normally the target's username.
pub fn switch_on(state: &UserwareState, session: &Session, identifier: &str) {
    session.set(&state.settings().userware.switched_user_key, json!(identifier));
}

/// Removes any switch. Returns `true` if one was recorded.
pub fn switch_off(state: &UserwareState, session: &Session) -> bool {
    session
        .remove(&state.settings().userware.switched_user_key)
        .is_some()
}

/// Substitutes the switched-to account as the acting identity.
///
/// Must run after [`AuthenticationMiddleware`](crate::AuthenticationMiddleware).
pub struct UserSwitchMiddleware {
    state: Arc<UserwareState>,
}

impl UserSwitchMiddleware {
    pub fn new(state: Arc<UserwareState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Middleware for UserSwitchMiddleware {
    async fn process_request(&self, request: &mut HttpRequest) -> Option<HttpResponse> {
        let session = Session::from_request(request)?;
        let identifier = switched_identifier(&self.state, &session)?;

        let Some(context) = request.extensions_mut().get_mut::<AuthContext>() else {
            return None;
        };
        let Some(principal) = context.principal.as_ref() else {
            return None;
        };
        let principal_id = principal.id;

        match resolver::resolve(self.state.directory(), &identifier).await {
            Some(target) if target.is_superuser => {
                tracing::warn!(
                    principal_id,
                    target = %identifier,
                    "Switched identity is a superuser, acting as the principal"
                );
            }
            Some(target) => {
                tracing::debug!(principal_id, target = %target.username, "Acting as switched user");
                context.acting = Some(target);
            }
            None => {
                tracing::debug!(principal_id, target = %identifier, "Switched identity did not resolve");
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use userware_core::Settings;

    use super::*;
    use crate::account::Account;

    async fn state() -> Arc<UserwareState> {
        let state = UserwareState::new(Settings::default());
        let mut staff = Account::new("staff", "staff@x.com");
        staff.is_staff = true;
        state.directory().create(staff).await.unwrap();
        state.directory().create(Account::new("bob", "bob@x.com")).await.unwrap();
        let mut root = Account::new("root", "root@x.com");
        root.is_superuser = true;
        state.directory().create(root).await.unwrap();
        Arc::new(state)
    }

    async fn request(state: &UserwareState, switched: Option<&str>, logged_in: bool) -> HttpRequest {
        let session = Session::detached();
        if let Some(identifier) = switched {
            switch_on(state, &session, identifier);
        }
        let principal = if logged_in {
            state.directory().get_by_id(1).await.unwrap()
        } else {
            None
        };
        let mut request = HttpRequest::builder().path("/").build();
        request.extensions_mut().insert(session);
        request.extensions_mut().insert(AuthContext {
            principal,
            acting: None,
        });
        request
    }

    #[tokio::test]
    async fn test_not_switched() {
        let state = state().await;
        let mut req = request(&state, None, true).await;
        UserSwitchMiddleware::new(Arc::clone(&state)).process_request(&mut req).await;
        assert_eq!(AuthContext::from_request(&req).user().unwrap().username, "staff");
    }

    #[tokio::test]
    async fn test_switched_by_username_or_email() {
        let state = state().await;
        for identifier in ["bob", "BOB@x.com"] {
            let mut req = request(&state, Some(identifier), true).await;
            UserSwitchMiddleware::new(Arc::clone(&state)).process_request(&mut req).await;
            let context = AuthContext::from_request(&req);
            assert_eq!(context.user().unwrap().username, "bob");
            assert_eq!(context.principal().unwrap().username, "staff");
        }
    }

    #[tokio::test]
    async fn test_unresolvable_target_fails_open() {
        let state = state().await;
        let mut req = request(&state, Some("ghost"), true).await;
        let response = UserSwitchMiddleware::new(Arc::clone(&state)).process_request(&mut req).await;
        assert!(response.is_none());
        assert_eq!(AuthContext::from_request(&req).user().unwrap().username, "staff");
    }

    #[tokio::test]
    async fn test_superuser_target_is_never_acted_as() {
        let state = state().await;
        let mut req = request(&state, Some("root"), true).await;
        UserSwitchMiddleware::new(Arc::clone(&state)).process_request(&mut req).await;
        assert_eq!(AuthContext::from_request(&req).user().unwrap().username, "staff");
    }

    #[tokio::test]
    async fn test_anonymous_request_ignores_switch() {
        let state = state().await;
        let mut req = request(&state, Some("bob"), false).await;
        UserSwitchMiddleware::new(Arc::clone(&state)).process_request(&mut req).await;
        assert!(AuthContext::from_request(&req).user().is_none());
    }

    #[tokio::test]
    async fn test_switch_store() {
        let state = state().await;
        let session = Session::detached();
        assert!(switched_identifier(&state, &session).is_none());
        switch_on(&state, &session, "bob");
        assert_eq!(switched_identifier(&state, &session).as_deref(), Some("bob"));
        assert!(switch_off(&state, &session));
        assert!(!switch_off(&state, &session));
    }
}
