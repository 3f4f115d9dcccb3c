//! # userware-core
//!
//! Core types for userware. Provides the settings system, the error type
//! hierarchy, and logging setup shared by every other userware crate.
//!
//! ## Modules
//!
//! - [`settings`] - Settings struct with account rule defaults
//! - [`settings_loader`] - TOML/JSON loading with `USERWARE_*` env overrides
//! - [`error`] - Error types: [`UserwareError`], [`ValidationError`]
//! - [`checks`] - Configuration checks run by the `check` command
//! - [`logging`] - Tracing subscriber setup and per-request spans

pub mod checks;
pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

pub use error::{UserwareError, UserwareResult, ValidationError};
pub use checks::{CheckLevel, CheckMessage};
pub use settings::{Settings, UserwareSettings};
