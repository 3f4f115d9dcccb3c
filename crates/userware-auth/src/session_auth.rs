//! Session-based authentication.
//!
//! A logged-in session carries three keys: the account id, the name of the
//! backend that authenticated it, and an HMAC of the account's password
//! hash. The hash ties the session to the current credential: once the
//! password changes, every session still holding the old hash is treated as
//! anonymous.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use userware_core::UserwareResult;
use userware_views::Session;

use crate::account::Account;
use crate::backends::AuthBackend;
use crate::hashers::constant_time_eq;
use crate::state::UserwareState;

/// Session key for the authenticated account id.
pub const SESSION_USER_KEY: &str = "_auth_user_id";
/// Session key for the authentication backend name.
pub const SESSION_BACKEND_KEY: &str = "_auth_user_backend";
/// Session key for the password fingerprint.
pub const SESSION_HASH_KEY: &str = "_auth_user_hash";

const HASH_SALT: &str = "userware.auth.session_auth_hash";

/// Computes the session fingerprint of a password hash.
pub fn session_auth_hash(secret: &str, password_hash: &str) -> String {
    use std::fmt::Write;

    let mut mac = Hmac::<Sha256>::new_from_slice(format!("{HASH_SALT}{secret}").as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(password_hash.as_bytes());
    mac.finalize()
        .into_bytes()
        .iter()
        .fold(String::with_capacity(64), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}

fn session_user_id(session: &Session) -> Option<u64> {
    session.get_str(SESSION_USER_KEY)?.parse().ok()
}

/// Logs `account` in to `session` and records the login time.
///
/// A session that belonged to a different account is flushed first;
/// otherwise its key is cycled. Any impersonation is cleared.
pub async fn login(
    state: &UserwareState,
    session: &Session,
    account: &mut Account,
) -> UserwareResult<()> {
    let secret = &state.settings().secret_key;
    let hash = session_auth_hash(secret, &account.password);

    let same_account = session_user_id(session) == Some(account.id)
        && session
            .get_str(SESSION_HASH_KEY)
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), hash.as_bytes()));
    if session.contains_key(SESSION_USER_KEY) && !same_account {
        session.flush();
    } else {
        session.cycle_key();
    }

    session.remove(&state.settings().userware.switched_user_key);
    session.set(SESSION_USER_KEY, json!(account.id.to_string()));
    session.set(SESSION_BACKEND_KEY, json!(state.backend_name()));
    session.set(SESSION_HASH_KEY, json!(hash));

    account.last_login = Some(Utc::now());
    state.directory().update(account).await?;
    tracing::info!(account_id = account.id, username = %account.username, "Logged in");
    Ok(())
}

/// Ends the session. All data, including any impersonation, is discarded.
pub fn logout(session: &Session) {
    if let Some(id) = session_user_id(session) {
        tracing::info!(account_id = id, "Logged out");
    }
    session.flush();
}

/// Refreshes the fingerprint after `account`'s password changed, so the
/// current session stays logged in. Sessions of other accounts are left
/// alone.
pub fn update_session_auth_hash(state: &UserwareState, session: &Session, account: &Account) {
    if session_user_id(session) != Some(account.id) {
        return;
    }
    session.cycle_key();
    session.set(
        SESSION_HASH_KEY,
        json!(session_auth_hash(&state.settings().secret_key, &account.password)),
    );
}

/// Deletes every stored session of `account` except the one named by `keep`.
pub async fn force_logout_others(
    state: &UserwareState,
    account: &Account,
    keep: Option<&str>,
) -> UserwareResult<usize> {
    let removed = state
        .sessions()
        .delete_where(SESSION_USER_KEY, &json!(account.id.to_string()), keep)
        .await?;
    if removed > 0 {
        tracing::info!(account_id = account.id, removed, "Invalidated other sessions");
    }
    Ok(removed)
}

/// Returns the account logged in to `session`, if it is still valid.
///
/// The account must exist, be active and still have the password the
/// session was created with. A session whose fingerprint no longer matches
/// is flushed.
pub async fn get_user_from_session(state: &UserwareState, session: &Session) -> Option<Account> {
    let id = session_user_id(session)?;
    let backend = state.backend();
    if session.get_str(SESSION_BACKEND_KEY).as_deref() != Some(backend.name()) {
        return None;
    }

    let account = match backend.get_user(id).await {
        Ok(Some(account)) => account,
        Ok(None) => return None,
        Err(e) => {
            tracing::error!(account_id = id, error = %e, "Failed to load session account");
            return None;
        }
    };

    let stored = session.get_str(SESSION_HASH_KEY).unwrap_or_default();
    let current = session_auth_hash(&state.settings().secret_key, &account.password);
    if !constant_time_eq(stored.as_bytes(), current.as_bytes()) {
        tracing::warn!(account_id = id, "Session fingerprint mismatch, flushing session");
        session.flush();
        return None;
    }

    account.is_active.then_some(account)
}
