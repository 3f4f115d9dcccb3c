//! Assembling the account application.

use std::sync::Arc;

use userware_core::UserwareResult;
use userware_views::{MessagesMiddleware, SessionMiddleware, UserwareApp};

use crate::middleware::AuthenticationMiddleware;
use crate::state::UserwareState;
use crate::switch::UserSwitchMiddleware;
use crate::urls::account_routes;

/// Builds the account routes and the middleware stack over `state`.
///
/// Middleware order: sessions, authentication, user switching, messages.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use userware_auth::{build_app, UserwareState};
/// use userware_core::Settings;
///
/// let state = Arc::new(UserwareState::new(Settings::default()));
/// let app = build_app(&state).unwrap();
/// assert_eq!(app.middleware_count(), 4);
/// let _router = app.into_axum_router();
/// ```
pub fn build_app(state: &Arc<UserwareState>) -> UserwareResult<UserwareApp> {
    let settings = state.settings();
    let routes = account_routes(state)?;
    tracing::debug!(prefix = %routes.prefix(), routes = routes.patterns().len(), "Account routes built");

    Ok(UserwareApp::new(settings.clone())
        .routes(routes)
        .middleware(SessionMiddleware::from_settings(state.sessions(), settings))
        .middleware(AuthenticationMiddleware::new(Arc::clone(state)))
        .middleware(UserSwitchMiddleware::new(Arc::clone(state)))
        .middleware(MessagesMiddleware))
}
