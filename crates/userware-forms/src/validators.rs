//! Email validation.

use once_cell::sync::Lazy;
use regex::Regex;

/// Loose "looks like an email" test used to classify identifiers.
static SIMPLE_EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("valid regex"));

/// Strict address check applied by email fields.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,63}$",
    )
    .expect("valid regex")
});

/// Returns `true` if `value` has the shape `x@y.z` with no whitespace.
///
/// ```
/// use userware_forms::validators::is_email_shaped;
///
/// assert!(is_email_shaped("alice@x.com"));
/// assert!(!is_email_shaped("alice"));
/// assert!(!is_email_shaped("alice@localhost"));
/// ```
pub fn is_email_shaped(value: &str) -> bool {
    SIMPLE_EMAIL_RE.is_match(value)
}

/// Returns `true` if `value` is a valid email address.
pub fn validate_email(value: &str) -> bool {
    value.len() <= 254 && !value.contains("..") && EMAIL_RE.is_match(value)
}
