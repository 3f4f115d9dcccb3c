//! Password reset notifications.
//!
//! Delivery is external: the reset flow hands a [`ResetNotification`] to a
//! [`ResetNotifier`]. [`LoggingNotifier`] only logs the link and is the
//! default for development.

use async_trait::async_trait;
use serde::Serialize;

use userware_core::UserwareResult;
use userware_http::HttpRequest;

use crate::account::Account;
use crate::state::UserwareState;
use crate::tokens::encode_uid;
use crate::urls::reset_confirm_path;

/// A reset link addressed to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetNotification {
    /// Sender address, from `default_from_email`.
    pub from_email: String,
    /// Recipient address.
    pub to_email: String,
    pub username: String,
    pub uidb64: String,
    pub token: String,
    /// Absolute URL of the set-new-password page.
    pub reset_url: String,
}

/// Delivers reset notifications.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send(&self, notification: ResetNotification) -> UserwareResult<()>;
}

/// Logs notifications at `info` instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl ResetNotifier for LoggingNotifier {
    async fn send(&self, notification: ResetNotification) -> UserwareResult<()> {
        tracing::info!(
            to = %notification.to_email,
            username = %notification.username,
            url = %notification.reset_url,
            "Password reset link issued"
        );
        Ok(())
    }
}

/// Issues a reset token for `account` and hands the link to the notifier.
///
/// The link is absolute, built on the host of `request`. A host outside
/// `allowed_hosts` fails with
/// [`SuspiciousOperation`](userware_core::UserwareError::SuspiciousOperation) before
/// any token is issued.
pub async fn send_reset_link(
    state: &UserwareState,
    request: &HttpRequest,
    account: &Account,
) -> UserwareResult<()> {
    let settings = state.settings();
    let host = request.get_validated_host(&settings.effective_allowed_hosts())?;
    let uidb64 = encode_uid(account.id);
    let token = state.token_generator().make_token(account);
    let reset_url = format!(
        "{}://{host}{}",
        request.scheme(),
        reset_confirm_path(settings, &uidb64, &token)
    );

    let notification = ResetNotification {
        from_email: state.settings().default_from_email.clone(),
        to_email: account.email.clone(),
        username: account.username.clone(),
        uidb64,
        token,
        reset_url,
    };
    state.notifier().send(notification).await?;
    tracing::info!(account_id = account.id, "Password reset requested");
    Ok(())
}
