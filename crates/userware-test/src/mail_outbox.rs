//! Capture of password reset notifications.
//!
//! [`MailOutbox`] is a [`ResetNotifier`] that stores every notification
//! instead of delivering it, so tests can follow the reset link.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use userware_auth::UserwareState;
//! use userware_core::Settings;
//! use userware_test::MailOutbox;
//!
//! let outbox = MailOutbox::new();
//! let state = UserwareState::new(Settings::default()).with_notifier(Arc::new(outbox.clone()));
//! assert!(outbox.is_empty());
//! # drop(state);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use userware_auth::{ResetNotification, ResetNotifier};
use userware_core::UserwareResult;

/// An in-memory outbox shared between the application and the test.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MailOutbox {
    messages: Arc<Mutex<Vec<ResetNotification>>>,
}

impl MailOutbox {
    /// Creates an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every captured notification, oldest first.
    pub fn messages(&self) -> Vec<ResetNotification> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the most recent notification.
    pub fn last(&self) -> Option<ResetNotification> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all captured notifications.
    pub fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Path and query of the most recent reset link, ready for the test client.
    pub fn last_reset_path(&self) -> Option<String> {
        self.last().map(|notification| path_of(&notification.reset_url))
    }
}

/// Strips the scheme and authority from an absolute URL.
fn path_of(url: &str) -> String {
    let Some((_, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    rest.find('/')
        .map_or_else(|| "/".to_string(), |slash| rest[slash..].to_string())
}

#[async_trait]
impl ResetNotifier for MailOutbox {
    async fn send(&self, notification: ResetNotification) -> UserwareResult<()> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}
