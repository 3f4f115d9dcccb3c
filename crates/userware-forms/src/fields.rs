//! Form field definitions and field-level cleaning.
//!
//! Each [`FormFieldDef`] describes a single field: its type, label, help
//! text, widget and custom error messages. [`clean_field_value`] turns the
//! raw submitted string into a cleaned string or a list of error messages.

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;

use crate::validators;

/// How a field is presented to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    /// A single-line text input.
    TextInput,
    /// An email input.
    EmailInput,
    /// A masked password input.
    PasswordInput,
    /// A hidden input.
    HiddenInput,
}

/// The type of a form field, with its type-specific parameters.
#[derive(Debug, Clone)]
pub enum FormFieldType {
    /// A character field.
    Char {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
        /// Whether to strip leading and trailing whitespace.
        strip: bool,
    },
    /// An email address field. Always stripped.
    Email {
        /// Maximum length in characters.
        max_length: Option<usize>,
    },
    /// A character field that must match a regular expression. Always stripped.
    Regex {
        /// The compiled pattern.
        regex: Regex,
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
    },
}

impl FormFieldType {
    /// A stripped character field with an optional maximum length.
    pub const fn char(max_length: Option<usize>) -> Self {
        Self::Char {
            min_length: None,
            max_length,
            strip: true,
        }
    }

    /// An unstripped character field, as used for passwords.
    pub const fn password() -> Self {
        Self::Char {
            min_length: None,
            max_length: None,
            strip: false,
        }
    }

    fn max_length(&self) -> Option<usize> {
        match self {
            Self::Char { max_length, .. }
            | Self::Email { max_length }
            | Self::Regex { max_length, .. } => *max_length,
        }
    }
}

/// Complete definition of a form field.
#[derive(Debug, Clone)]
pub struct FormFieldDef {
    /// The field name.
    pub name: String,
    /// The field type, controlling cleaning.
    pub field_type: FormFieldType,
    /// Whether this field is required.
    pub required: bool,
    /// Human-readable label.
    pub label: String,
    /// Help text displayed alongside the field.
    pub help_text: String,
    /// The widget used to present the field.
    pub widget: WidgetType,
    /// Custom error messages keyed by error code
    /// (`required`, `invalid`, `min_length`, `max_length`).
    pub error_messages: HashMap<String, String>,
}

impl FormFieldDef {
    /// Creates a required field with the default widget for its type.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let widget = match &field_type {
            FormFieldType::Email { .. } => WidgetType::EmailInput,
            FormFieldType::Char { strip: false, .. } => WidgetType::PasswordInput,
            _ => WidgetType::TextInput,
        };
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            label,
            help_text: String::new(),
            widget,
            error_messages: HashMap::new(),
        }
    }

    /// Sets whether this field is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the widget.
    #[must_use]
    pub const fn widget(mut self, widget: WidgetType) -> Self {
        self.widget = widget;
        self
    }

    /// Sets a custom error message for a given code.
    #[must_use]
    pub fn error_message(mut self, code: impl Into<String>, msg: impl Into<String>) -> Self {
        self.error_messages.insert(code.into(), msg.into());
        self
    }

    fn message(&self, code: &str, default: impl FnOnce() -> String) -> String {
        self.error_messages.get(code).cloned().unwrap_or_else(default)
    }

    /// Returns the client-facing description of this field.
    pub fn schema(&self) -> FieldSchema {
        FieldSchema {
            name: self.name.clone(),
            label: self.label.clone(),
            help_text: self.help_text.clone(),
            widget: self.widget,
            required: self.required,
            max_length: self.field_type.max_length(),
        }
    }
}

/// The JSON description of a field returned by form GET requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    /// The field name.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Help text.
    pub help_text: String,
    /// Widget.
    pub widget: WidgetType,
    /// Whether the field is required.
    pub required: bool,
    /// Maximum length, if bounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

fn check_length(
    field: &FormFieldDef,
    value: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
    errors: &mut Vec<String>,
) {
    let len = value.chars().count();
    if let Some(min) = min_length.filter(|min| len < *min) {
        errors.push(field.message("min_length", || {
            format!("Ensure this value has at least {min} characters (it has {len}).")
        }));
    }
    if let Some(max) = max_length.filter(|max| len > *max) {
        errors.push(field.message("max_length", || {
            format!("Ensure this value has at most {max} characters (it has {len}).")
        }));
    }
}

/// Cleans a raw submitted value.
///
/// 1. Strips whitespace unless the field is an unstripped char field
/// 2. Required check
/// 3. Length and format checks
///
/// Returns the cleaned value or every error found.
///
/// # Examples
///
/// ```
/// use userware_forms::fields::{clean_field_value, FormFieldDef, FormFieldType};
///
/// let field = FormFieldDef::new("switched_username", FormFieldType::char(Some(30)));
/// assert_eq!(clean_field_value(&field, Some("  bob ")), Ok("bob".to_string()));
/// assert!(clean_field_value(&field, None).is_err());
/// ```
pub fn clean_field_value(field: &FormFieldDef, raw: Option<&str>) -> Result<String, Vec<String>> {
    let raw = raw.unwrap_or("");
    let value = match &field.field_type {
        FormFieldType::Char { strip: false, .. } => raw,
        _ => raw.trim(),
    };

    if value.is_empty() {
        if field.required {
            return Err(vec![
                field.message("required", || "This field is required.".to_string())
            ]);
        }
        return Ok(String::new());
    }

    let mut errors = Vec::new();
    match &field.field_type {
        FormFieldType::Char {
            min_length,
            max_length,
            ..
        } => check_length(field, value, *min_length, *max_length, &mut errors),
        FormFieldType::Email { max_length } => {
            check_length(field, value, None, *max_length, &mut errors);
            if !validators::validate_email(value) {
                errors.push(field.message("invalid", || "Enter a valid email address.".to_string()));
            }
        }
        FormFieldType::Regex {
            regex,
            min_length,
            max_length,
        } => {
            check_length(field, value, *min_length, *max_length, &mut errors);
            if !regex.is_match(value) {
                errors.push(field.message("invalid", || "Enter a valid value.".to_string()));
            }
        }
    }

    if errors.is_empty() {
        Ok(value.to_string())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn username_field() -> FormFieldDef {
        FormFieldDef::new(
            "username",
            FormFieldType::Regex {
                regex: Regex::new(r"^[a-zA-Z0-9]+(-[a-zA-Z0-9]+)*$").unwrap(),
                min_length: Some(3),
                max_length: Some(32),
            },
        )
        .error_message("invalid", "bad username")
    }

    #[test]
    fn test_required() {
        let field = FormFieldDef::new("name", FormFieldType::char(None));
        assert_eq!(
            clean_field_value(&field, Some("   ")),
            Err(vec!["This field is required.".to_string()])
        );
        let optional = FormFieldDef::new("name", FormFieldType::char(None)).required(false);
        assert_eq!(clean_field_value(&optional, None), Ok(String::new()));
    }

    #[test]
    fn test_custom_required_message() {
        let field = FormFieldDef::new("name", FormFieldType::char(None))
            .error_message("required", "Please fill this in.");
        assert_eq!(
            clean_field_value(&field, None),
            Err(vec!["Please fill this in.".to_string()])
        );
    }

    #[test]
    fn test_password_is_not_stripped() {
        let field = FormFieldDef::new("password", FormFieldType::password());
        assert_eq!(clean_field_value(&field, Some(" pw ")), Ok(" pw ".to_string()));
        assert_eq!(field.widget, WidgetType::PasswordInput);
    }

    #[test]
    fn test_char_max_length() {
        let field = FormFieldDef::new("switched_username", FormFieldType::char(Some(3)));
        let errors = clean_field_value(&field, Some("abcd")).unwrap_err();
        assert_eq!(
            errors,
            vec!["Ensure this value has at most 3 characters (it has 4).".to_string()]
        );
    }

    #[test]
    fn test_regex_field() {
        let field = username_field();
        assert_eq!(clean_field_value(&field, Some("bob-smith")), Ok("bob-smith".into()));
        assert_eq!(
            clean_field_value(&field, Some("-bob")),
            Err(vec!["bad username".to_string()])
        );
        assert_eq!(clean_field_value(&field, Some("ab")).unwrap_err().len(), 1);
        assert_eq!(clean_field_value(&field, Some("a--")).unwrap_err().len(), 1);
    }

    #[test]
    fn test_email_field() {
        let field = FormFieldDef::new("email", FormFieldType::Email { max_length: Some(254) });
        assert_eq!(field.widget, WidgetType::EmailInput);
        assert_eq!(clean_field_value(&field, Some(" a@x.com ")), Ok("a@x.com".into()));
        assert_eq!(
            clean_field_value(&field, Some("nope")),
            Err(vec!["Enter a valid email address.".to_string()])
        );
    }

    #[test]
    fn test_schema() {
        let schema = username_field().label("Username").schema();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["name"], "username");
        assert_eq!(json["label"], "Username");
        assert_eq!(json["widget"], "text_input");
        assert_eq!(json["max_length"], 32);
        assert_eq!(json["required"], true);
    }
}
