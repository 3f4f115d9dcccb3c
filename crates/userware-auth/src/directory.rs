//! The user directory.
//!
//! [`UserDirectory`] is the storage seam for accounts. Lookups by username
//! and email are case-insensitive exact matches, and writes enforce
//! case-insensitive uniqueness of both fields atomically.
//!
//! [`InMemoryUserDirectory`] is the bundled implementation, used for
//! development and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use userware_core::{UserwareError, UserwareResult, ValidationError};

use crate::account::Account;

/// Error code carried by uniqueness violations.
pub const UNIQUE_CODE: &str = "unique";

/// Storage for accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetches an account by id.
    async fn get_by_id(&self, id: u64) -> UserwareResult<Option<Account>>;

    /// Fetches the account whose username equals `username`, ignoring case.
    async fn find_by_username_iexact(&self, username: &str) -> UserwareResult<Option<Account>>;

    /// Fetches the account whose email equals `email`, ignoring case.
    async fn find_by_email_iexact(&self, email: &str) -> UserwareResult<Option<Account>>;

    /// Stores a new account and returns it with its assigned id.
    ///
    /// A username or email that collides with an existing account fails
    /// with a [`UserwareError::ValidationError`] whose field errors name the
    /// colliding field with code [`UNIQUE_CODE`].
    async fn create(&self, account: Account) -> UserwareResult<Account>;

    /// Replaces an existing account. Uniqueness is checked as in `create`,
    /// ignoring the account itself.
    async fn update(&self, account: &Account) -> UserwareResult<()>;

    /// Removes an account permanently.
    async fn delete(&self, id: u64) -> UserwareResult<()>;
}

/// Builds the error returned when `field` collides with an existing account.
pub fn unique_violation(field: &str) -> UserwareError {
    let mut field_errors = HashMap::new();
    field_errors.insert(
        field.to_string(),
        vec![ValidationError::new(
            format!("An account with that {field} already exists."),
            UNIQUE_CODE,
        )],
    );
    UserwareError::ValidationError(ValidationError::with_field_errors(field_errors))
}

/// Returns the fields named by a uniqueness violation, if `error` is one.
pub fn unique_fields(error: &UserwareError) -> Vec<&str> {
    let UserwareError::ValidationError(validation) = error else {
        return Vec::new();
    };
    let mut fields: Vec<&str> = validation
        .field_errors
        .iter()
        .filter(|(_, errors)| errors.iter().any(|e| e.code == UNIQUE_CODE))
        .map(|(field, _)| field.as_str())
        .collect();
    fields.sort_unstable();
    fields
}

/// An in-memory directory. Ids are assigned sequentially from 1.
#[derive(Debug)]
pub struct InMemoryUserDirectory {
    accounts: RwLock<BTreeMap<u64, Account>>,
    next_id: AtomicU64,
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the number of stored accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Returns `true` if no account is stored.
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    fn check_unique(accounts: &BTreeMap<u64, Account>, account: &Account) -> UserwareResult<()> {
        for existing in accounts.values().filter(|a| a.id != account.id) {
            if existing.username.to_lowercase() == account.username.to_lowercase() {
                return Err(unique_violation("username"));
            }
            if existing.email.to_lowercase() == account.email.to_lowercase() {
                return Err(unique_violation("email"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_by_id(&self, id: u64) -> UserwareResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_username_iexact(&self, username: &str) -> UserwareResult<Option<Account>> {
        let needle = username.to_lowercase();
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.username.to_lowercase() == needle)
            .cloned())
    }

    async fn find_by_email_iexact(&self, email: &str) -> UserwareResult<Option<Account>> {
        let needle = email.to_lowercase();
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email.to_lowercase() == needle)
            .cloned())
    }

    async fn create(&self, mut account: Account) -> UserwareResult<Account> {
        let mut accounts = self.accounts.write().await;
        if account.id != 0 && accounts.contains_key(&account.id) {
            return Err(UserwareError::IntegrityError(format!(
                "account id {} is already taken",
                account.id
            )));
        }
        Self::check_unique(&accounts, &account)?;
        if account.id == 0 {
            account.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        } else {
            self.next_id.fetch_max(account.id + 1, Ordering::SeqCst);
        }
        accounts.insert(account.id, account.clone());
        tracing::debug!(account_id = account.id, username = %account.username, "Account created");
        Ok(account)
    }

    async fn update(&self, account: &Account) -> UserwareResult<()> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&account.id) {
            return Err(UserwareError::DoesNotExist(format!("account id {}", account.id)));
        }
        Self::check_unique(&accounts, account)?;
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn delete(&self, id: u64) -> UserwareResult<()> {
        self.accounts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| UserwareError::DoesNotExist(format!("account id {id}")))
    }
}
