//! # userware-test
//!
//! Testing utilities for userware applications:
//!
//! - [`client`] - [`TestClient`] drives an axum router in-process and keeps
//!   the session cookie between requests
//! - [`mail_outbox`] - [`MailOutbox`] captures password reset notifications

pub mod client;
pub mod mail_outbox;

pub use client::{TestClient, TestResponse, TEST_HOST};
pub use mail_outbox::MailOutbox;
