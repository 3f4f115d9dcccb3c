//! Password reset tokens and uid encoding.
//!
//! A token has the form `<base36 timestamp>-<hex HMAC-SHA256>`. The HMAC
//! covers the account id, its password hash, its last login and its active
//! flag, so a token stops working once the password changes, the account
//! logs in again or the account is disabled.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::account::Account;
use crate::hashers::constant_time_eq;

type HmacSha256 = Hmac<Sha256>;

const KEY_SALT: &str = "userware.auth.tokens.PasswordResetTokenGenerator";

/// Creates and checks password reset tokens.
#[derive(Clone)]
pub struct PasswordResetTokenGenerator {
    secret: String,
    timeout_seconds: u64,
}

impl std::fmt::Debug for PasswordResetTokenGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordResetTokenGenerator")
            .field("timeout_seconds", &self.timeout_seconds)
            .finish_non_exhaustive()
    }
}

impl PasswordResetTokenGenerator {
    /// Creates a generator keyed by `secret`. Tokens expire after
    /// `timeout_seconds`.
    pub fn new(secret: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            secret: secret.into(),
            timeout_seconds,
        }
    }

    /// Returns a token for `account`, valid from now.
    pub fn make_token(&self, account: &Account) -> String {
        self.make_token_at(account, now())
    }

    /// Returns a token for `account` stamped with `timestamp` (Unix seconds).
    pub fn make_token_at(&self, account: &Account, timestamp: u64) -> String {
        format!("{}-{}", to_base36(timestamp), self.signature(account, timestamp))
    }

    /// Returns `true` if `token` is valid for `account` now.
    pub fn check_token(&self, account: &Account, token: &str) -> bool {
        self.check_token_at(account, token, now())
    }

    /// Returns `true` if `token` is valid for `account` at `now` (Unix seconds).
    pub fn check_token_at(&self, account: &Account, token: &str, now: u64) -> bool {
        let Some((ts, signature)) = token.split_once('-') else {
            return false;
        };
        let Some(timestamp) = from_base36(ts) else {
            return false;
        };
        let expected = self.signature(account, timestamp);
        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return false;
        }
        now.saturating_sub(timestamp) <= self.timeout_seconds
    }

    fn signature(&self, account: &Account, timestamp: u64) -> String {
        let last_login = account
            .last_login
            .map(|t| t.timestamp().to_string())
            .unwrap_or_default();
        let value = format!(
            "{}{}{}{}{}",
            account.id, account.password, last_login, account.is_active, timestamp
        );
        let mut mac = HmacSha256::new_from_slice(format!("{KEY_SALT}{}", self.secret).as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(value.as_bytes());
        hex(&mac.finalize().into_bytes())
    }
}

fn now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Encodes `n` in lowercase base 36.
pub fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Decodes a base 36 string. Longer inputs than any `u64` needs are rejected.
pub fn from_base36(s: &str) -> Option<u64> {
    if s.is_empty() || s.len() > 13 {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}

/// Encodes an account id for use in a reset link.
pub fn encode_uid(id: u64) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Decodes a uid produced by [`encode_uid`].
pub fn decode_uid(uidb64: &str) -> Option<u64> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64).ok()?;
    std::str::from_utf8(&bytes).ok()?.parse().ok()
}
