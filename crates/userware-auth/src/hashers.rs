//! Password hashing.
//!
//! Two backends are provided: [`Argon2Hasher`] (the default) and
//! [`BcryptHasher`]. Hashing and verification run on
//! `tokio::task::spawn_blocking` so the CPU-bound work never stalls the
//! runtime. Verification picks the backend from the encoded hash, so
//! accounts hashed with either algorithm keep working when the configured
//! hasher changes.

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;

use userware_core::{UserwareError, UserwareResult};

/// Prefix marking a credential that can never match.
const UNUSABLE_PASSWORD_PREFIX: &str = "!";

/// A password hashing backend.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Returns the algorithm identifier (e.g. "argon2", "bcrypt").
    fn algorithm(&self) -> &str;

    /// Hashes a password into a self-describing encoded string.
    async fn hash(&self, password: &str) -> UserwareResult<String>;

    /// Verifies a password against an encoded hash.
    async fn verify(&self, password: &str, hash: &str) -> UserwareResult<bool>;

    /// Returns `true` if the hash was produced with weaker parameters.
    fn must_update(&self, hash: &str) -> bool;
}

fn join_error(e: &tokio::task::JoinError) -> UserwareError {
    UserwareError::HashingError(format!("Task join error: {e}"))
}

/// Argon2id password hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

#[async_trait]
impl PasswordHasher for Argon2Hasher {
    fn algorithm(&self) -> &'static str {
        "argon2"
    }

    async fn hash(&self, password: &str) -> UserwareResult<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            use argon2::password_hash::{rand_core::OsRng, PasswordHasher as _, SaltString};
            use argon2::Argon2;

            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| UserwareError::HashingError(format!("Argon2 hash error: {e}")))
        })
        .await
        .map_err(|e| join_error(&e))?
    }

    async fn verify(&self, password: &str, hash: &str) -> UserwareResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            use argon2::password_hash::{PasswordHash, PasswordVerifier};
            use argon2::Argon2;

            let parsed = PasswordHash::new(&hash)
                .map_err(|e| UserwareError::HashingError(format!("Invalid hash: {e}")))?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| join_error(&e))?
    }

    fn must_update(&self, hash: &str) -> bool {
        !hash.starts_with("$argon2id$")
    }
}

/// Bcrypt password hasher.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    /// The bcrypt cost parameter.
    pub cost: u32,
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self { cost: 12 }
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    fn algorithm(&self) -> &'static str {
        "bcrypt"
    }

    async fn hash(&self, password: &str) -> UserwareResult<String> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || {
            bcrypt::hash(password, cost)
                .map_err(|e| UserwareError::HashingError(format!("Bcrypt hash error: {e}")))
        })
        .await
        .map_err(|e| join_error(&e))?
    }

    async fn verify(&self, password: &str, hash: &str) -> UserwareResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            bcrypt::verify(password, &hash)
                .map_err(|e| UserwareError::HashingError(format!("Bcrypt verify error: {e}")))
        })
        .await
        .map_err(|e| join_error(&e))?
    }

    fn must_update(&self, hash: &str) -> bool {
        hash.strip_prefix("$2b$")
            .and_then(|s| s.get(..2))
            .and_then(|cost| cost.parse::<u32>().ok())
            .is_some_and(|stored| stored < self.cost)
    }
}

fn identify_hasher(encoded: &str) -> Option<Box<dyn PasswordHasher>> {
    if encoded.starts_with("$argon2") {
        Some(Box::new(Argon2Hasher))
    } else if encoded.starts_with("$2b$") || encoded.starts_with("$2a$") || encoded.starts_with("$2y$") {
        Some(Box::new(BcryptHasher::default()))
    } else {
        None
    }
}

/// Hashes `password` with `hasher`.
pub async fn make_password(hasher: &dyn PasswordHasher, password: &str) -> UserwareResult<String> {
    hasher.hash(password).await
}

/// Checks `password` against an encoded hash.
///
/// The backend is identified from the hash. Unusable hashes never match.
pub async fn check_password(password: &str, hash: &str) -> UserwareResult<bool> {
    if !is_password_usable(hash) {
        return Ok(false);
    }
    let hasher = identify_hasher(hash).ok_or_else(|| {
        UserwareError::HashingError(format!(
            "Unknown password hashing algorithm for hash: {}",
            hash.chars().take(10).collect::<String>()
        ))
    })?;
    hasher.verify(password, hash).await
}

/// Returns `true` unless `hash` is empty or marked unusable.
pub fn is_password_usable(hash: &str) -> bool {
    !hash.is_empty() && !hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

/// Returns a credential that no password matches.
pub fn make_unusable_password() -> String {
    format!("{UNUSABLE_PASSWORD_PREFIX}{}", make_random_password(40))
}

/// Returns `length` random alphanumeric characters.
pub fn make_random_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Compares two byte strings in constant time.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Argon2 ──

    #[tokio::test]
    async fn test_argon2_round_trip() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("Secret123").await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Secret123", &hash).await.unwrap());
        assert!(!hasher.verify("secret123", &hash).await.unwrap());
        assert!(!hasher.must_update(&hash));
    }

    #[tokio::test]
    async fn test_argon2_salts_differ() {
        let a = Argon2Hasher.hash("pw").await.unwrap();
        let b = Argon2Hasher.hash("pw").await.unwrap();
        assert_ne!(a, b);
    }

    // ── Bcrypt ──

    #[tokio::test]
    async fn test_bcrypt_round_trip() {
        let hasher = BcryptHasher { cost: 4 };
        let hash = hasher.hash("Secret123").await.unwrap();
        assert!(hasher.verify("Secret123", &hash).await.unwrap());
        assert!(!hasher.verify("nope", &hash).await.unwrap());
        assert!(BcryptHasher { cost: 5 }.must_update(&hash));
        assert!(!hasher.must_update(&hash));
    }

    // ── check_password ──

    #[tokio::test]
    async fn test_check_password_identifies_backend() {
        let bcrypt = make_password(&BcryptHasher { cost: 4 }, "pw").await.unwrap();
        let argon = make_password(&Argon2Hasher, "pw").await.unwrap();
        assert!(check_password("pw", &bcrypt).await.unwrap());
        assert!(check_password("pw", &argon).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_password_unusable() {
        let unusable = make_unusable_password();
        assert!(!is_password_usable(&unusable));
        assert!(!check_password("anything", &unusable).await.unwrap());
        assert!(!check_password("anything", "").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_password_unknown_algorithm() {
        let err = check_password("pw", "md5$abc").await.unwrap_err();
        assert!(matches!(err, UserwareError::HashingError(_)));
    }

    // ── helpers ──

    #[test]
    fn test_random_password() {
        let pw = make_random_password(20);
        assert_eq!(pw.len(), 20);
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(pw, make_random_password(20));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
