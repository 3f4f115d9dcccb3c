//! # userware-auth
//!
//! Account management on top of the userware request pipeline:
//!
//! - [`account`] and [`directory`] - The account record and the user
//!   directory it is stored in
//! - [`hashers`] - Argon2 and bcrypt password hashing
//! - [`resolver`] and [`backends`] - Finding an account by username or email
//!   and authenticating it
//! - [`session_auth`] and [`middleware`] - Session login and the
//!   per-request [`AuthContext`]
//! - [`switch`] - Staff impersonation and its middleware
//! - [`tokens`] and [`notify`] - Password reset links
//! - [`forms`], [`views`], [`decorators`] and [`urls`] - The account routes
//! - [`admin`] - Admin descriptors
//! - [`signals`] - Signals sent by the views
//!
//! [`UserwareState`] ties the collaborators together and [`build_app`]
//! assembles the routes and middleware into a servable application.

pub mod account;
pub mod admin;
pub mod app;
pub mod backends;
pub mod decorators;
pub mod directory;
pub mod forms;
pub mod hashers;
pub mod middleware;
pub mod notify;
pub mod resolver;
pub mod session_auth;
pub mod signals;
pub mod state;
pub mod switch;
pub mod tokens;
pub mod urls;
pub mod views;

pub use account::Account;
pub use admin::{AdminRegistry, Fieldset, ModelAdmin};
pub use app::build_app;
pub use backends::{AuthBackend, UsernameOrEmailBackend};
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use forms::{
    UserAuthenticationForm, UserChangeForm, UserCreationForm, UserDeletionForm, UserDisableForm,
    UserPasswordChangeForm, UserPasswordResetForm, UserSetPasswordForm, UserSwitchForm,
};
pub use hashers::{Argon2Hasher, BcryptHasher, PasswordHasher};
pub use middleware::{AuthContext, AuthenticationMiddleware};
pub use notify::{LoggingNotifier, ResetNotification, ResetNotifier};
pub use signals::{AccountSignals, UserSwitchedOn};
pub use state::UserwareState;
pub use switch::UserSwitchMiddleware;
pub use tokens::PasswordResetTokenGenerator;
pub use urls::account_routes;
