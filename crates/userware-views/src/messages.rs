//! Messages framework for one-time notifications.
//!
//! Messages such as "You are now logged out." are queued during one request
//! and shown on the next. They live in the session under the `_messages` key
//! and are consumed when read.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use userware_http::{HttpRequest, HttpResponse};

use crate::middleware::Middleware;
use crate::session::Session;

/// Session key holding queued messages.
pub const MESSAGES_SESSION_KEY: &str = "_messages";

/// The severity level of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    /// Debug-level message, typically not shown in production.
    Debug = 10,
    /// Informational message.
    Info = 20,
    /// Success notification.
    Success = 25,
    /// Warning that requires attention.
    Warning = 30,
    /// Error message indicating a failure.
    Error = 40,
}

impl MessageLevel {
    /// Returns the tag used when rendering this level.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A single notification message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The severity level of this message.
    pub level: MessageLevel,
    /// The message text.
    pub text: String,
}

impl Message {
    /// Creates a new message with the given level and text.
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Session-backed message storage for the current request.
///
/// # Examples
///
/// ```
/// use userware_views::messages::{MessageLevel, Messages};
/// use userware_views::session::Session;
///
/// let messages = Messages::new(Session::detached());
/// messages.success("Your password was changed.");
/// assert!(messages.has_pending());
///
/// let drained = messages.get_messages();
/// assert_eq!(drained[0].level, MessageLevel::Success);
/// assert!(!messages.has_pending());
/// ```
#[derive(Debug, Clone)]
pub struct Messages {
    session: Session,
}

impl Messages {
    /// Wraps a session.
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Returns the message storage attached to `request` by [`MessagesMiddleware`].
    pub fn from_request(request: &HttpRequest) -> Option<Self> {
        request.extensions().get::<Self>().cloned()
    }

    fn load(&self) -> Vec<Message> {
        self.session
            .get(MESSAGES_SESSION_KEY)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    /// Queues a message.
    pub fn add(&self, level: MessageLevel, text: impl Into<String>) {
        let mut queued = self.load();
        queued.push(Message::new(level, text));
        match serde_json::to_value(&queued) {
            Ok(value) => self.session.set(MESSAGES_SESSION_KEY, value),
            Err(e) => tracing::warn!(error = %e, "dropping message that failed to serialize"),
        }
    }

    /// Queues an info message.
    pub fn info(&self, text: impl Into<String>) {
        self.add(MessageLevel::Info, text);
    }

    /// Queues a success message.
    pub fn success(&self, text: impl Into<String>) {
        self.add(MessageLevel::Success, text);
    }

    /// Queues a warning message.
    pub fn warning(&self, text: impl Into<String>) {
        self.add(MessageLevel::Warning, text);
    }

    /// Queues an error message.
    pub fn error(&self, text: impl Into<String>) {
        self.add(MessageLevel::Error, text);
    }

    /// Returns the queued messages without consuming them.
    pub fn peek(&self) -> Vec<Message> {
        self.load()
    }

    /// Drains and returns all queued messages.
    pub fn get_messages(&self) -> Vec<Message> {
        let queued = self.load();
        if self.session.contains_key(MESSAGES_SESSION_KEY) {
            self.session.remove(MESSAGES_SESSION_KEY);
        }
        queued
    }

    /// Returns `true` if any message is queued.
    pub fn has_pending(&self) -> bool {
        !self.load().is_empty()
    }
}

/// Attaches [`Messages`] to each request. Must run after the session middleware.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessagesMiddleware;

#[async_trait]
impl Middleware for MessagesMiddleware {
    async fn process_request(&self, request: &mut HttpRequest) -> Option<HttpResponse> {
        match Session::from_request(request) {
            Some(session) => {
                request.extensions_mut().insert(Messages::new(session));
            }
            None => tracing::warn!("messages middleware installed without a session"),
        }
        None
    }
}
