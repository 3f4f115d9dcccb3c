//! # userware
//!
//! User account management for axum applications.
//!
//! This is the meta-crate that re-exports all sub-crates. Depend on
//! `userware` to get everything, or on individual crates for finer-grained
//! control.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use userware::auth::{build_app, UserwareState};
//! use userware::core::settings_loader;
//!
//! # async fn serve() -> Result<(), userware::core::UserwareError> {
//! let settings = settings_loader::from_env();
//! userware::core::logging::setup_logging(&settings);
//! let state = Arc::new(UserwareState::new(settings));
//! let addr = state.settings().bind_address.clone();
//! build_app(&state)?.run(&addr).await
//! # }
//! ```

/// Settings, errors, configuration checks and logging.
pub use userware_core as core;

/// HTTP layer: request, response, query dicts and the route table.
#[cfg(feature = "http")]
pub use userware_http as http;

/// Middleware pipeline, sessions, messages and the axum bridge.
#[cfg(feature = "views")]
pub use userware_views as views;

/// Form fields, validation and error collection.
#[cfg(feature = "forms")]
pub use userware_forms as forms;

/// Signal dispatcher.
#[cfg(feature = "signals")]
pub use userware_signals as signals;

/// Accounts, authentication, switching, password reset and the account routes.
#[cfg(feature = "auth")]
pub use userware_auth as auth;

/// Management commands.
#[cfg(feature = "cli")]
pub use userware_cli as cli;

/// Test client and reset mail outbox.
#[cfg(feature = "testing")]
pub use userware_test as test;

// Third-party re-exports
pub use async_trait;
pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
