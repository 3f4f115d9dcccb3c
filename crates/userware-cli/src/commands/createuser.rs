//! The `createuser` management command.
//!
//! Runs the given credentials through [`UserCreationForm`] and prints the
//! resulting account or the validation errors.

use std::sync::Arc;

use async_trait::async_trait;
use userware_auth::{Account, UserCreationForm, UserwareState};
use userware_core::{Settings, UserwareError, ValidationError};
use userware_forms::{Form, FormErrors};
use userware_http::QueryDict;

use crate::command::ManagementCommand;

/// Creates an account from command-line credentials.
pub struct CreateuserCommand;

/// The credentials and flags for a new account.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub staff: bool,
    pub superuser: bool,
}

impl NewAccount {
    fn from_matches(matches: &clap::ArgMatches) -> Self {
        let text = |name: &str| {
            matches
                .get_one::<String>(name)
                .cloned()
                .unwrap_or_default()
        };
        let superuser = matches.get_flag("superuser");
        Self {
            username: text("username"),
            email: text("email"),
            password: text("password"),
            staff: superuser || matches.get_flag("staff"),
            superuser,
        }
    }
}

/// Validates `new` with the creation form and creates the account.
///
/// The outer error is an infrastructure failure; the inner one carries the
/// form errors.
pub async fn create_account(
    state: &Arc<UserwareState>,
    new: &NewAccount,
) -> Result<Result<Account, FormErrors>, UserwareError> {
    let mut form = UserCreationForm::new(Arc::clone(state));
    form.bind(&QueryDict::from_pairs(&[
        ("username", new.username.as_str()),
        ("email", new.email.as_str()),
        ("password1", new.password.as_str()),
        ("password2", new.password.as_str()),
    ]));
    if !form.is_valid().await {
        return Ok(Err(form.errors().clone()));
    }
    Ok(form
        .save_as(new.staff, new.superuser)
        .await?
        .ok_or_else(|| form.errors().clone()))
}

fn into_validation_error(errors: &FormErrors) -> ValidationError {
    let field_errors = errors
        .iter()
        .map(|(field, messages)| {
            let messages = messages
                .iter()
                .map(|message| ValidationError::new(message.clone(), "invalid"))
                .collect();
            (field.to_string(), messages)
        })
        .collect();
    ValidationError::with_field_errors(field_errors)
}

#[async_trait]
impl ManagementCommand for CreateuserCommand {
    fn name(&self) -> &'static str {
        "createuser"
    }

    fn help(&self) -> &'static str {
        "Validate and create an account"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("username")
                .long("username")
                .required(true)
                .help("Username for the account"),
        )
        .arg(
            clap::Arg::new("email")
                .long("email")
                .required(true)
                .help("Email address for the account"),
        )
        .arg(
            clap::Arg::new("password")
                .long("password")
                .required(true)
                .help("Password for the account"),
        )
        .arg(
            clap::Arg::new("staff")
                .long("staff")
                .action(clap::ArgAction::SetTrue)
                .help("Allow the account to switch to other users"),
        )
        .arg(
            clap::Arg::new("superuser")
                .long("superuser")
                .action(clap::ArgAction::SetTrue)
                .help("Mark the account as superuser (implies --staff)"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), UserwareError> {
        let new = NewAccount::from_matches(matches);
        let state = Arc::new(UserwareState::new(settings.clone()));

        match create_account(&state, &new).await? {
            Ok(account) => {
                let json = serde_json::to_string_pretty(&account)
                    .map_err(|e| UserwareError::SerializationError(e.to_string()))?;
                println!("{json}");
                Ok(())
            }
            Err(errors) => {
                for (field, messages) in errors.iter() {
                    for message in messages {
                        eprintln!("{field}: {message}");
                    }
                }
                Err(UserwareError::ValidationError(into_validation_error(&errors)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use userware_auth::BcryptHasher;

    use super::*;

    fn state() -> Arc<UserwareState> {
        Arc::new(
            UserwareState::new(Settings::default()).with_hasher(Arc::new(BcryptHasher { cost: 4 })),
        )
    }

    fn new_account(username: &str, email: &str, password: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            ..NewAccount::default()
        }
    }

    // ── Arguments ────────────────────────────────────────────────────

    #[test]
    fn test_superuser_implies_staff() {
        let matches = CreateuserCommand
            .add_arguments(clap::Command::new("createuser"))
            .try_get_matches_from([
                "createuser",
                "--username",
                "boss",
                "--email",
                "boss@x.com",
                "--password",
                "Secret123",
                "--superuser",
            ])
            .unwrap();
        let new = NewAccount::from_matches(&matches);
        assert!(new.staff);
        assert!(new.superuser);
        assert_eq!(new.email, "boss@x.com");
    }

    #[test]
    fn test_credentials_are_required() {
        let result = CreateuserCommand
            .add_arguments(clap::Command::new("createuser"))
            .try_get_matches_from(["createuser", "--username", "alice"]);
        assert!(result.is_err());
    }

    // ── Creation ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_account_success() {
        let state = state();
        let mut new = new_account("alice", "alice@x.com", "Secret123");
        new.staff = true;
        let account = create_account(&state, &new).await.unwrap().unwrap();
        assert_eq!(account.username, "alice");
        assert!(account.is_staff);
        assert!(!account.is_superuser);
        assert!(account.check_password("Secret123").await);
    }

    #[tokio::test]
    async fn test_create_account_reports_form_errors() {
        let state = state();
        let errors = create_account(&state, &new_account("admin", "not-an-email", "abc"))
            .await
            .unwrap()
            .unwrap_err();
        assert!(errors.has_field("username"));
        assert!(errors.has_field("email"));
    }

    #[tokio::test]
    async fn test_create_account_duplicate() {
        let state = state();
        create_account(&state, &new_account("alice", "alice@x.com", "Secret123"))
            .await
            .unwrap()
            .unwrap();
        let errors = create_account(&state, &new_account("Alice", "a2@x.com", "Secret123"))
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.get("username"), ["A user with that username already exists."]);
    }

    #[test]
    fn test_into_validation_error_keeps_fields() {
        let mut errors = FormErrors::new();
        errors.add("email", "Enter a valid email address.");
        let err = into_validation_error(&errors);
        assert_eq!(err.field_errors["email"][0].message, "Enter a valid email address.");
    }
}
