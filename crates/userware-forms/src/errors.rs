//! Form error collection.

use std::collections::BTreeMap;

use serde::Serialize;

/// Key under which form-level errors are stored.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Validation errors keyed by field name, with form-level errors under
/// [`NON_FIELD_ERRORS`]. Serializes as a plain JSON object.
///
/// # Examples
///
/// ```
/// use userware_forms::FormErrors;
///
/// let mut errors = FormErrors::new();
/// errors.add("email", "A user with that email already exists.");
/// errors.add_non_field("Confirmation failed.");
///
/// assert!(errors.has_field("email"));
/// assert_eq!(errors.non_field_errors(), ["Confirmation failed."]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    /// Creates an empty error collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Records a form-level error.
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    /// Records several errors against `field`.
    pub fn extend(&mut self, field: &str, messages: impl IntoIterator<Item = String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .extend(messages);
    }

    /// Returns the errors for `field`.
    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if `field` has at least one error.
    pub fn has_field(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    /// Returns the form-level errors.
    pub fn non_field_errors(&self) -> &[String] {
        self.get(NON_FIELD_ERRORS)
    }

    /// Returns `true` if there are no errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Removes every error.
    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Iterates over `(field, messages)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let errors = FormErrors::new();
        assert!(errors.is_empty());
        assert!(errors.get("username").is_empty());
        assert!(errors.non_field_errors().is_empty());
    }

    #[test]
    fn test_accumulates_per_field() {
        let mut errors = FormErrors::new();
        errors.add("password2", "The two password fields didn't match.");
        errors.add("password2", "Password too short!");
        assert_eq!(errors.get("password2").len(), 2);
        assert!(!errors.has_field("username"));
    }

    #[test]
    fn test_serializes_as_object() {
        let mut errors = FormErrors::new();
        errors.add("username", "Invalid username");
        errors.add_non_field("Login Failed.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"__all__": ["Login Failed."], "username": ["Invalid username"]})
        );
    }

    #[test]
    fn test_clear_and_iter() {
        let mut errors = FormErrors::new();
        errors.extend("a", vec!["x".to_string(), "y".to_string()]);
        errors.add("b", "z");
        let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["a", "b"]);
        errors.clear();
        assert!(errors.is_empty());
    }
}
