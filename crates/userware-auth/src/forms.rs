//! Account forms.
//!
//! Each lifecycle operation is a form: field-level cleaning from
//! `userware-forms`, then a [`Form::clean`] override that consults the user
//! directory, then a `save`-style method that performs the single directory
//! write. Error texts live in the `*Messages` structs so they can be
//! replaced as a whole.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use userware_core::{UserwareError, UserwareResult};
use userware_forms::{BaseForm, Form, FormFieldDef, FormFieldType};
use userware_http::HttpRequest;

use crate::account::Account;
use crate::backends::AuthBackend;
use crate::directory::{unique_fields, UserDirectory};
use crate::hashers::make_random_password;
use crate::notify;
use crate::resolver::{self, IdentifierKind};
use crate::state::UserwareState;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+(-[a-zA-Z0-9]+)*$").expect("valid regex"));

const USERNAME_HELP: &str =
    "Username may only contain alphanumeric or dashes and cannot begin or end with a dash.";

// ── Messages ─────────────────────────────────────────────────────────

/// Errors reported by [`UserCreationForm`] and [`UserChangeForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationMessages {
    pub invalid_username: String,
    /// Also used for reserved and too-short usernames.
    pub duplicate_username: String,
    pub duplicate_email: String,
    pub password_mismatch: String,
    /// `{min}` is replaced with the configured minimum length.
    pub password_too_short: String,
}

impl Default for CreationMessages {
    fn default() -> Self {
        Self {
            invalid_username: "Username may only contain alphanumeric characters  or dashes \
                               and cannot begin or end with a dash."
                .into(),
            duplicate_username: "A user with that username already exists.".into(),
            duplicate_email: "A user with that email already exists.".into(),
            password_mismatch: "The two password fields didn't match.".into(),
            password_too_short: "Password too short! minimum length is  [{min}].".into(),
        }
    }
}

/// Errors reported by [`UserAuthenticationForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationMessages {
    pub invalid_login: String,
    pub inactive: String,
}

impl Default for AuthenticationMessages {
    fn default() -> Self {
        Self {
            invalid_login: "Login Failed.  Note that both fields may be case-sensitive.".into(),
            inactive: "This account is inactive.".into(),
        }
    }
}

/// Errors reported by [`UserPasswordResetForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetMessages {
    pub invalid_login: String,
    pub unknown_email: String,
    pub unusable_email: String,
    pub unknown_username: String,
    pub unusable_username: String,
}

impl Default for ResetMessages {
    fn default() -> Self {
        Self {
            invalid_login: "Please enter a username or a valid email address.".into(),
            unknown_email: "That email address doesn't have an associated user account \
                            or is not a email address."
                .into(),
            unusable_email: "The user account associated with this email address \
                             cannot reset the password."
                .into(),
            unknown_username: "That username doesn't have an associated user account. \
                               Are you sure you've registered?"
                .into(),
            unusable_username: "The user account associated with this username address \
                                cannot reset the password."
                .into(),
        }
    }
}

/// Errors reported by [`UserPasswordChangeForm`] and [`UserSetPasswordForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordMessages {
    pub password_incorrect: String,
    pub password_mismatch: String,
    /// `{min}` is replaced with the configured minimum length.
    pub password_too_short: String,
    pub password_too_similar: String,
}

impl Default for PasswordMessages {
    fn default() -> Self {
        Self {
            password_incorrect: "Your old password was entered incorrectly. Please enter it again."
                .into(),
            password_mismatch: "The two password fields didn't match.".into(),
            password_too_short: "Password too short! minimum length is  [{min}].".into(),
            password_too_similar: "New password is too similar to the old password. \
                                   Please choose a different password."
                .into(),
        }
    }
}

/// Errors reported by [`UserDeletionForm`] and [`UserDisableForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationMessages {
    pub confirmation_failed: String,
    pub invalid_password: String,
}

impl Default for ConfirmationMessages {
    fn default() -> Self {
        Self {
            confirmation_failed: "Confirmation failed.".into(),
            invalid_password: "Invalid password, please try again.".into(),
        }
    }
}

/// Errors reported by [`UserSwitchForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchMessages {
    pub invalid_username: String,
    pub not_permitted: String,
}

impl Default for SwitchMessages {
    fn default() -> Self {
        Self {
            invalid_username: "Invalid username".into(),
            not_permitted: "Operation is not permitted.".into(),
        }
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

fn username_field(max_length: usize, invalid: &str) -> FormFieldDef {
    FormFieldDef::new(
        "username",
        FormFieldType::Regex {
            regex: USERNAME_RE.clone(),
            min_length: Some(3),
            max_length: Some(max_length),
        },
    )
    .label("Username")
    .help_text(USERNAME_HELP)
    .error_message("invalid", invalid)
}

fn min_length_help(min: usize) -> String {
    format!("Password must be minimum of {min} characters.")
}

fn owned(base: &BaseForm, field: &str) -> Option<String> {
    base.cleaned(field).map(ToString::to_string)
}

/// Returns the id of the account holding `value` in `field`, if any.
/// A failing directory counts as no match; the write will catch a conflict.
async fn holder_of(directory: &dyn UserDirectory, field: &str, value: &str) -> Option<u64> {
    let found = match field {
        "email" => directory.find_by_email_iexact(value).await,
        _ => directory.find_by_username_iexact(value).await,
    };
    match found {
        Ok(account) => account.map(|a| a.id),
        Err(e) => {
            tracing::error!(field, error = %e, "Uniqueness lookup failed");
            None
        }
    }
}

/// Checks a new password pair: match, minimum length, and, when `current`
/// is given, difference from the current password. Errors go on `field2`.
async fn check_new_password(
    base: &mut BaseForm,
    (field1, field2): (&str, &str),
    min_length: usize,
    current: Option<&Account>,
    messages: &PasswordMessages,
) {
    let (Some(first), Some(second)) = (owned(base, field1), owned(base, field2)) else {
        return;
    };
    if first != second {
        base.add_error(Some(field2), &messages.password_mismatch);
    } else if second.chars().count() < min_length {
        base.add_error(
            Some(field2),
            messages.password_too_short.replace("{min}", &min_length.to_string()),
        );
    } else if let Some(account) = current {
        if account.check_password(&second).await {
            base.add_error(Some(field2), &messages.password_too_similar);
        }
    }
}

fn not_valid() -> UserwareError {
    UserwareError::BadRequest("form has not been validated".into())
}

// ── UserCreationForm ─────────────────────────────────────────────────

/// Registers a new account.
pub struct UserCreationForm {
    base: BaseForm,
    state: Arc<UserwareState>,
    messages: CreationMessages,
}

impl UserCreationForm {
    pub fn new(state: Arc<UserwareState>) -> Self {
        Self::with_messages(state, CreationMessages::default())
    }

    pub fn with_messages(state: Arc<UserwareState>, messages: CreationMessages) -> Self {
        let min = state.settings().userware.password_min_length;
        let base = BaseForm::new(vec![
            username_field(32, &messages.invalid_username),
            FormFieldDef::new("email", FormFieldType::Email { max_length: Some(254) })
                .label("Email")
                .help_text("A valid email address"),
            FormFieldDef::new("password1", FormFieldType::password())
                .label("Password")
                .help_text(min_length_help(min)),
            FormFieldDef::new("password2", FormFieldType::password())
                .label("Password confirmation")
                .help_text("Enter the same password as above, for verification."),
        ]);
        Self {
            base,
            state,
            messages,
        }
    }

    /// Creates a regular account from the validated data.
    ///
    /// Returns `Ok(None)` when the directory rejects the username or email
    /// as taken; the form then carries the same error the pre-check gives.
    pub async fn save(&mut self) -> UserwareResult<Option<Account>> {
        self.save_as(false, false).await
    }

    /// Creates an account with the given flags from the validated data.
    pub async fn save_as(
        &mut self,
        is_staff: bool,
        is_superuser: bool,
    ) -> UserwareResult<Option<Account>> {
        let (Some(username), Some(email), Some(password)) = (
            owned(&self.base, "username"),
            owned(&self.base, "email"),
            owned(&self.base, "password1"),
        ) else {
            return Err(not_valid());
        };

        let mut account = Account::new(username, email);
        account.is_staff = is_staff;
        account.is_superuser = is_superuser;
        account.set_password(self.state.hasher(), &password).await?;

        match self.state.directory().create(account).await {
            Ok(account) => {
                tracing::info!(account_id = account.id, username = %account.username, "Account registered");
                Ok(Some(account))
            }
            Err(e) => {
                let fields = unique_fields(&e);
                if fields.is_empty() {
                    return Err(e);
                }
                for field in fields {
                    let message = if field == "email" {
                        &self.messages.duplicate_email
                    } else {
                        &self.messages.duplicate_username
                    };
                    self.base.add_error(Some(field), message.clone());
                }
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Form for UserCreationForm {
    fn name(&self) -> &'static str {
        "user_creation"
    }

    fn base(&self) -> &BaseForm {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        &mut self.base
    }

    async fn clean(&mut self) {
        let rules = &self.state.settings().userware;
        let directory = self.state.directory();

        if let Some(username) = owned(&self.base, "username") {
            let rejected = rules.is_reserved(&username)
                || username.chars().count() < rules.username_min_length
                || holder_of(directory, "username", &username).await.is_some();
            if rejected {
                self.base
                    .add_error(Some("username"), &self.messages.duplicate_username);
            }
        }

        if let Some(email) = owned(&self.base, "email") {
            if holder_of(directory, "email", &email).await.is_some() {
                self.base.add_error(Some("email"), &self.messages.duplicate_email);
            }
        }

        if let (Some(first), Some(second)) =
            (owned(&self.base, "password1"), owned(&self.base, "password2"))
        {
            let min = rules.password_min_length;
            if first != second {
                self.base
                    .add_error(Some("password2"), &self.messages.password_mismatch);
            } else if second.chars().count() < min {
                self.base.add_error(
                    Some("password2"),
                    self.messages
                        .password_too_short
                        .replace("{min}", &min.to_string()),
                );
            }
        }
    }
}

// ── UserChangeForm ───────────────────────────────────────────────────

/// Edits an existing account's identity fields. Used by the user admin.
pub struct UserChangeForm {
    base: BaseForm,
    state: Arc<UserwareState>,
    account: Account,
    messages: CreationMessages,
}

impl UserChangeForm {
    pub fn new(state: Arc<UserwareState>, account: Account) -> Self {
        let messages = CreationMessages::default();
        let base = BaseForm::new(vec![
            username_field(30, &messages.invalid_username),
            FormFieldDef::new("email", FormFieldType::Email { max_length: Some(254) })
                .label("Email"),
            FormFieldDef::new("first_name", FormFieldType::char(Some(30)))
                .label("First name")
                .required(false),
            FormFieldDef::new("last_name", FormFieldType::char(Some(30)))
                .label("Last name")
                .required(false),
        ]);
        Self {
            base,
            state,
            account,
            messages,
        }
    }

    /// The account being edited.
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Writes the validated fields back to the directory.
    pub async fn save(&mut self) -> UserwareResult<Option<Account>> {
        let (Some(username), Some(email)) =
            (owned(&self.base, "username"), owned(&self.base, "email"))
        else {
            return Err(not_valid());
        };
        let mut account = self.account.clone();
        account.username = username;
        account.email = email;
        account.first_name = owned(&self.base, "first_name").unwrap_or_default();
        account.last_name = owned(&self.base, "last_name").unwrap_or_default();

        match self.state.directory().update(&account).await {
            Ok(()) => {
                self.account = account.clone();
                Ok(Some(account))
            }
            Err(e) => {
                let fields = unique_fields(&e);
                if fields.is_empty() {
                    return Err(e);
                }
                for field in fields {
                    let message = if field == "email" {
                        &self.messages.duplicate_email
                    } else {
                        &self.messages.duplicate_username
                    };
                    self.base.add_error(Some(field), message.clone());
                }
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Form for UserChangeForm {
    fn name(&self) -> &'static str {
        "user_change"
    }

    fn base(&self) -> &BaseForm {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        &mut self.base
    }

    async fn clean(&mut self) {
        let rules = &self.state.settings().userware;
        let directory = self.state.directory();
        let own_id = self.account.id;

        if let Some(username) = owned(&self.base, "username") {
            let taken = holder_of(directory, "username", &username)
                .await
                .is_some_and(|id| id != own_id);
            if taken
                || rules.is_reserved(&username)
                || username.chars().count() < rules.username_min_length
            {
                self.base
                    .add_error(Some("username"), &self.messages.duplicate_username);
            }
        }

        if let Some(email) = owned(&self.base, "email") {
            let taken = holder_of(directory, "email", &email)
                .await
                .is_some_and(|id| id != own_id);
            if taken {
                self.base.add_error(Some("email"), &self.messages.duplicate_email);
            } else {
                self.base.set_cleaned("email", email.to_lowercase());
            }
        }
    }
}

// ── UserAuthenticationForm ───────────────────────────────────────────

/// Logs in with a username or email address and a password.
pub struct UserAuthenticationForm {
    base: BaseForm,
    state: Arc<UserwareState>,
    messages: AuthenticationMessages,
    account: Option<Account>,
}

impl UserAuthenticationForm {
    pub fn new(state: Arc<UserwareState>) -> Self {
        let base = BaseForm::new(vec![
            FormFieldDef::new("username", FormFieldType::char(Some(254)))
                .label("Username or Email")
                .help_text("Enter your account's username or email address."),
            FormFieldDef::new("password", FormFieldType::password()).label("Password"),
        ]);
        Self {
            base,
            state,
            messages: AuthenticationMessages::default(),
            account: None,
        }
    }

    /// The authenticated account, after a successful `is_valid`.
    pub const fn get_user(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Takes the authenticated account out of the form.
    pub fn take_user(&mut self) -> Option<Account> {
        self.account.take()
    }
}

#[async_trait]
impl Form for UserAuthenticationForm {
    fn name(&self) -> &'static str {
        "user_authentication"
    }

    fn base(&self) -> &BaseForm {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        &mut self.base
    }

    async fn clean(&mut self) {
        self.account = None;
        let (Some(identifier), Some(password)) =
            (owned(&self.base, "username"), owned(&self.base, "password"))
        else {
            return;
        };

        match self.state.backend().authenticate(&identifier, &password).await {
            None => {
                tracing::warn!(identifier = %identifier, "Login failed");
                self.base.add_error(None, &self.messages.invalid_login);
            }
            Some(account) if !account.is_active => {
                tracing::warn!(account_id = account.id, "Login refused for inactive account");
                self.base.add_error(None, &self.messages.inactive);
            }
            Some(account) => self.account = Some(account),
        }
    }
}

// ── UserPasswordResetForm ────────────────────────────────────────────

/// Requests a password reset link for a username or email address.
pub struct UserPasswordResetForm {
    base: BaseForm,
    state: Arc<UserwareState>,
    messages: ResetMessages,
    account: Option<Account>,
}

impl UserPasswordResetForm {
    pub fn new(state: Arc<UserwareState>) -> Self {
        Self::with_messages(state, ResetMessages::default())
    }

    pub fn with_messages(state: Arc<UserwareState>, messages: ResetMessages) -> Self {
        let base = BaseForm::new(vec![FormFieldDef::new(
            "username_or_email",
            FormFieldType::char(Some(254)),
        )
        .label("Username or Email")
        .help_text(
            "Enter your username or email address to receive instructions on how to reset \
             your password.",
        )
        .error_message("required", &messages.invalid_login)]);
        Self {
            base,
            state,
            messages,
            account: None,
        }
    }

    /// The account a link will be sent to, after a successful `is_valid`.
    pub const fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Sends the reset link to the resolved account's email.
    pub async fn save(&self, request: &HttpRequest) -> UserwareResult<()> {
        let account = self.account.as_ref().ok_or_else(not_valid)?;
        notify::send_reset_link(&self.state, request, account).await
    }
}

#[async_trait]
impl Form for UserPasswordResetForm {
    fn name(&self) -> &'static str {
        "user_password_reset"
    }

    fn base(&self) -> &BaseForm {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        &mut self.base
    }

    async fn clean(&mut self) {
        self.account = None;
        let Some(identifier) = owned(&self.base, "username_or_email") else {
            return;
        };
        let kind = IdentifierKind::classify(&identifier);
        let message = match resolver::resolve(self.state.directory(), &identifier).await {
            None => match kind {
                IdentifierKind::Email => &self.messages.unknown_email,
                IdentifierKind::Username => &self.messages.unknown_username,
            },
            Some(account) if !account.is_active => match kind {
                IdentifierKind::Email => &self.messages.unusable_email,
                IdentifierKind::Username => &self.messages.unusable_username,
            },
            Some(account) => {
                self.account = Some(account);
                return;
            }
        };
        self.base.add_error(None, message.clone());
    }
}

// ── UserPasswordChangeForm ───────────────────────────────────────────

/// Changes the password of a signed-in account.
pub struct UserPasswordChangeForm {
    base: BaseForm,
    state: Arc<UserwareState>,
    account: Account,
    messages: PasswordMessages,
}

impl UserPasswordChangeForm {
    pub fn new(state: Arc<UserwareState>, account: Account) -> Self {
        let min = state.settings().userware.password_min_length;
        let base = BaseForm::new(vec![
            FormFieldDef::new("old_password", FormFieldType::password())
                .label("Current Password")
                .help_text("Changing your password will log you out of all of your other sessions."),
            FormFieldDef::new("new_password1", FormFieldType::password())
                .label("New password")
                .help_text(min_length_help(min)),
            FormFieldDef::new("new_password2", FormFieldType::password())
                .label("New password confirmation"),
        ]);
        Self {
            base,
            state,
            account,
            messages: PasswordMessages::default(),
        }
    }

    /// Stores the new password and returns the updated account.
    pub async fn save(&mut self) -> UserwareResult<Account> {
        let password = owned(&self.base, "new_password2").ok_or_else(not_valid)?;
        self.account.set_password(self.state.hasher(), &password).await?;
        self.state.directory().update(&self.account).await?;
        tracing::info!(account_id = self.account.id, "Password changed");
        Ok(self.account.clone())
    }
}

#[async_trait]
impl Form for UserPasswordChangeForm {
    fn name(&self) -> &'static str {
        "user_password_change"
    }

    fn base(&self) -> &BaseForm {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        &mut self.base
    }

    async fn clean(&mut self) {
        if let Some(old) = owned(&self.base, "old_password") {
            if !self.account.check_password(&old).await {
                self.base
                    .add_error(Some("old_password"), &self.messages.password_incorrect);
            }
        }
        check_new_password(
            &mut self.base,
            ("new_password1", "new_password2"),
            self.state.settings().userware.password_min_length,
            Some(&self.account),
            &self.messages,
        )
        .await;
    }
}

// ── UserSetPasswordForm ──────────────────────────────────────────────

/// Sets a new password from a reset link.
pub struct UserSetPasswordForm {
    base: BaseForm,
    state: Arc<UserwareState>,
    account: Account,
    messages: PasswordMessages,
}

impl UserSetPasswordForm {
    pub fn new(state: Arc<UserwareState>, account: Account) -> Self {
        let min = state.settings().userware.password_min_length;
        let base = BaseForm::new(vec![
            FormFieldDef::new("new_password1", FormFieldType::password())
                .label("New password")
                .help_text(min_length_help(min)),
            FormFieldDef::new("new_password2", FormFieldType::password())
                .label("New password confirmation")
                .help_text("Resetting your password will log you out of all of your other sessions."),
        ]);
        Self {
            base,
            state,
            account,
            messages: PasswordMessages::default(),
        }
    }

    /// Stores the new password and returns the updated account.
    pub async fn save(&mut self) -> UserwareResult<Account> {
        let password = owned(&self.base, "new_password2").ok_or_else(not_valid)?;
        self.account.set_password(self.state.hasher(), &password).await?;
        self.state.directory().update(&self.account).await?;
        tracing::info!(account_id = self.account.id, "Password reset");
        Ok(self.account.clone())
    }
}

#[async_trait]
impl Form for UserSetPasswordForm {
    fn name(&self) -> &'static str {
        "user_set_password"
    }

    fn base(&self) -> &BaseForm {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        &mut self.base
    }

    async fn clean(&mut self) {
        check_new_password(
            &mut self.base,
            ("new_password1", "new_password2"),
            self.state.settings().userware.password_min_length,
            Some(&self.account),
            &self.messages,
        )
        .await;
    }
}

// ── UserDeletionForm / UserDisableForm ───────────────────────────────

/// Confirms the signed-in account by identifier and password, then deletes it.
pub struct UserDeletionForm {
    base: BaseForm,
    state: Arc<UserwareState>,
    account: Account,
    messages: ConfirmationMessages,
    name: &'static str,
}

impl UserDeletionForm {
    pub fn new(state: Arc<UserwareState>, account: Account) -> Self {
        Self::build(
            state,
            account,
            "user_deletion",
            "Please confirm permanent account deletion by entering your password.",
        )
    }

    fn build(
        state: Arc<UserwareState>,
        account: Account,
        name: &'static str,
        password_help: &str,
    ) -> Self {
        let base = BaseForm::new(vec![
            FormFieldDef::new("username_or_email", FormFieldType::char(None))
                .label("Username or Email Confirmation")
                .help_text("Please confirm your username or email address."),
            FormFieldDef::new("password", FormFieldType::password())
                .label("Password Confirmation")
                .help_text(password_help),
        ]);
        Self {
            base,
            state,
            account,
            messages: ConfirmationMessages::default(),
            name,
        }
    }

    /// The account being confirmed.
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Removes the account permanently.
    pub async fn delete(&self) -> UserwareResult<()> {
        self.state.directory().delete(self.account.id).await?;
        tracing::info!(account_id = self.account.id, username = %self.account.username, "Account deleted");
        Ok(())
    }
}

#[async_trait]
impl Form for UserDeletionForm {
    fn name(&self) -> &'static str {
        self.name
    }

    fn base(&self) -> &BaseForm {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        &mut self.base
    }

    async fn clean(&mut self) {
        if let Some(identifier) = owned(&self.base, "username_or_email") {
            let confirmed = resolver::resolve(self.state.directory(), &identifier)
                .await
                .is_some_and(|found| found.id == self.account.id);
            if !confirmed {
                self.base
                    .add_error(Some("username_or_email"), &self.messages.confirmation_failed);
            }
        }
        if let Some(password) = owned(&self.base, "password") {
            if !self.account.check_password(&password).await {
                self.base
                    .add_error(Some("password"), &self.messages.invalid_password);
            }
        }
    }
}

/// Confirms the signed-in account like [`UserDeletionForm`], then disables it.
pub struct UserDisableForm(UserDeletionForm);

impl UserDisableForm {
    pub fn new(state: Arc<UserwareState>, account: Account) -> Self {
        Self(UserDeletionForm::build(
            state,
            account,
            "user_disable",
            "Please confirm account disable by entering your password.",
        ))
    }

    pub const fn account(&self) -> &Account {
        self.0.account()
    }

    /// Deactivates the account, replaces its credential with a random one
    /// and rewrites its email to `disabled-<id>-<email>`. The id keeps the
    /// sentinel unique when a freed address is reused and disabled again.
    pub async fn disable(&self) -> UserwareResult<Account> {
        let state = &self.0.state;
        let mut account = self.0.account.clone();
        account.is_active = false;
        account
            .set_password(state.hasher(), &make_random_password(20))
            .await?;
        account.email = format!("disabled-{}-{}", account.id, account.email);
        state.directory().update(&account).await?;
        tracing::info!(account_id = account.id, username = %account.username, "Account disabled");
        Ok(account)
    }
}

#[async_trait]
impl Form for UserDisableForm {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn base(&self) -> &BaseForm {
        self.0.base()
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        self.0.base_mut()
    }

    async fn clean(&mut self) {
        self.0.clean().await;
    }
}

// ── UserSwitchForm ───────────────────────────────────────────────────

/// Picks the account a staff member wants to act as.
pub struct UserSwitchForm {
    base: BaseForm,
    state: Arc<UserwareState>,
    messages: SwitchMessages,
    target: Option<Account>,
}

impl UserSwitchForm {
    pub fn new(state: Arc<UserwareState>) -> Self {
        let base = BaseForm::new(vec![FormFieldDef::new(
            "switched_username",
            FormFieldType::char(Some(30)),
        )
        .label("Username / Email")
        .help_text("Email or username of the user to switch to.")]);
        Self {
            base,
            state,
            messages: SwitchMessages::default(),
            target: None,
        }
    }

    /// The account the submitted identifier resolved to.
    pub const fn target(&self) -> Option<&Account> {
        self.target.as_ref()
    }

    /// The target's username, which is what the session records. A username
    /// keeps resolving when the target's email later changes.
    pub fn switched_username(&self) -> Option<&str> {
        self.target.as_ref().map(|target| target.username.as_str())
    }
}

#[async_trait]
impl Form for UserSwitchForm {
    fn name(&self) -> &'static str {
        "user_switch"
    }

    fn base(&self) -> &BaseForm {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        &mut self.base
    }

    async fn clean(&mut self) {
        self.target = None;
        let Some(identifier) = owned(&self.base, "switched_username") else {
            return;
        };
        match resolver::resolve(self.state.directory(), &identifier).await {
            None => self
                .base
                .add_error(Some("switched_username"), &self.messages.invalid_username),
            Some(target) if target.is_superuser => self
                .base
                .add_error(Some("switched_username"), &self.messages.not_permitted),
            Some(target) => self.target = Some(target),
        }
    }
}
