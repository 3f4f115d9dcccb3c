//! Error types for userware.
//!
//! [`UserwareError`] covers request-level failures, user directory failures,
//! validation failures, and configuration problems. Form validation failures
//! are not errors at this level: forms collect them as field messages. A
//! [`ValidationError`] surfaces here only when a directory write rejects data.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A validation failure with an optional set of per-field failures.
///
/// # Examples
///
/// ```
/// use userware_core::error::ValidationError;
///
/// let err = ValidationError::new("A user with that email already exists.", "duplicate_email");
/// assert_eq!(err.code, "duplicate_email");
///
/// let mut field_errors = std::collections::HashMap::new();
/// field_errors.insert("username".to_string(), vec![err]);
/// let err = ValidationError::with_field_errors(field_errors);
/// assert!(err.to_string().starts_with("username:"));
/// ```
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code identifying the failure (e.g. "required", "duplicate_username").
    pub code: String,
    /// Parameters used to build the message.
    pub params: HashMap<String, String>,
    /// Per-field validation errors, keyed by field name.
    pub field_errors: HashMap<String, Vec<Self>>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: HashMap::new(),
            field_errors: HashMap::new(),
        }
    }

    /// Creates a `ValidationError` containing per-field errors.
    pub fn with_field_errors(field_errors: HashMap<String, Vec<Self>>) -> Self {
        Self {
            message: String::new(),
            code: String::new(),
            params: HashMap::new(),
            field_errors,
        }
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            write!(f, "{}", self.message)?;
        } else if !self.field_errors.is_empty() {
            let mut fields: Vec<_> = self.field_errors.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            let mut first = true;
            for (field, errors) in fields {
                for error in errors {
                    if !first {
                        write!(f, "; ")?;
                    }
                    write!(f, "{field}: {error}")?;
                    first = false;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for userware.
///
/// Each variant maps to an HTTP status code via [`UserwareError::status_code`];
/// the account views answer a failed operation with that status.
#[derive(Error, Debug)]
pub enum UserwareError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── User directory errors ────────────────────────────────────────

    /// A lookup expected exactly one account but found none.
    #[error("Account does not exist: {0}")]
    DoesNotExist(String),

    /// A uniqueness constraint was violated on write.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// The user directory could not be reached or failed.
    #[error("Directory error: {0}")]
    DirectoryError(String),

    // ── Validation ───────────────────────────────────────────────────

    /// Submitted data failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── Security ─────────────────────────────────────────────────────

    /// The request carried something that must not be acted on, such as a
    /// `Host` header outside `allowed_hosts`.
    #[error("Suspicious operation: {0}")]
    SuspiciousOperation(String),

    /// Password hashing or verification failed.
    #[error("Hashing error: {0}")]
    HashingError(String),
}

impl UserwareError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest`, `ValidationError`, `SuspiciousOperation` -> 400
    /// - `NotFound`, `DoesNotExist` -> 404
    /// - `IntegrityError` -> 409
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::ValidationError(_) | Self::SuspiciousOperation(_) => 400,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::IntegrityError(_) => 409,
            Self::InternalServerError(_)
            | Self::DirectoryError(_)
            | Self::ConfigurationError(_)
            | Self::SerializationError(_)
            | Self::HashingError(_) => 500,
        }
    }

    /// Returns `true` for errors caused by the request rather than the server.
    pub const fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<ValidationError> for UserwareError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

impl From<serde_json::Error> for UserwareError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, UserwareError>`.
pub type UserwareResult<T> = Result<T, UserwareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_simple() {
        let err = ValidationError::new("This field is required.", "required");
        assert_eq!(err.to_string(), "This field is required.");
    }

    #[test]
    fn test_validation_error_display_field_errors_sorted() {
        let mut field_errors = HashMap::new();
        field_errors.insert(
            "username".to_string(),
            vec![ValidationError::new("Taken.", "duplicate_username")],
        );
        field_errors.insert(
            "email".to_string(),
            vec![ValidationError::new("Invalid.", "invalid")],
        );
        let err = ValidationError::with_field_errors(field_errors);
        assert_eq!(err.to_string(), "email: Invalid.; username: Taken.");
    }

    #[test]
    fn test_validation_error_with_param() {
        let err = ValidationError::new("Too short.", "min_length").with_param("min", "6");
        assert_eq!(err.params.get("min").map(String::as_str), Some("6"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(UserwareError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(UserwareError::NotFound("x".into()).status_code(), 404);
        assert_eq!(UserwareError::DoesNotExist("x".into()).status_code(), 404);
        assert_eq!(UserwareError::IntegrityError("x".into()).status_code(), 409);
        assert_eq!(UserwareError::DirectoryError("x".into()).status_code(), 500);
        assert_eq!(UserwareError::HashingError("x".into()).status_code(), 500);
        assert_eq!(
            UserwareError::ValidationError(ValidationError::new("x", "y")).status_code(),
            400
        );
        assert_eq!(UserwareError::SuspiciousOperation("x".into()).status_code(), 400);
    }

    #[test]
    fn test_client_errors() {
        assert!(UserwareError::SuspiciousOperation("bad host".into()).is_client_error());
        assert!(!UserwareError::DirectoryError("down".into()).is_client_error());
    }

    #[test]
    fn test_display() {
        let err = UserwareError::DoesNotExist("alice".into());
        assert_eq!(err.to_string(), "Account does not exist: alice");
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: UserwareError = ValidationError::new("bad", "invalid").into();
        assert!(matches!(err, UserwareError::ValidationError(_)));
    }
}
