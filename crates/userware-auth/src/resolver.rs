//! Identity resolution: find an account from a username or an email.
//!
//! An identifier shaped like `x@y.z` is looked up by email only; anything
//! else is looked up by username only. No match, a lookup on the wrong
//! field, and a failing directory all resolve to `None`.

use userware_forms::validators::is_email_shaped;

use crate::account::Account;
use crate::directory::UserDirectory;

/// How an identifier is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Looked up against the email field.
    Email,
    /// Looked up against the username field.
    Username,
}

impl IdentifierKind {
    /// Classifies `identifier`.
    ///
    /// ```
    /// use userware_auth::resolver::IdentifierKind;
    ///
    /// assert_eq!(IdentifierKind::classify("alice@x.com"), IdentifierKind::Email);
    /// assert_eq!(IdentifierKind::classify("alice"), IdentifierKind::Username);
    /// ```
    pub fn classify(identifier: &str) -> Self {
        if is_email_shaped(identifier) {
            Self::Email
        } else {
            Self::Username
        }
    }
}

/// Resolves `identifier` to a single account.
pub async fn resolve(directory: &dyn UserDirectory, identifier: &str) -> Option<Account> {
    let kind = IdentifierKind::classify(identifier);
    let result = match kind {
        IdentifierKind::Email => directory.find_by_email_iexact(identifier).await,
        IdentifierKind::Username => directory.find_by_username_iexact(identifier).await,
    };
    match result {
        Ok(account) => account,
        Err(e) => {
            tracing::error!(?kind, error = %e, "Identity lookup failed");
            None
        }
    }
}
