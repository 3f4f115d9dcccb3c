//! Form trait and `BaseForm` implementation.
//!
//! [`BaseForm`] owns the field definitions, the bound data, the cleaned
//! values and the accumulated errors. Concrete forms wrap a `BaseForm` and
//! implement [`Form`], overriding [`Form::clean`] for checks that need
//! other fields or async lookups.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use userware_http::QueryDict;

use crate::errors::FormErrors;
use crate::fields::{clean_field_value, FieldSchema, FormFieldDef};

/// The core form trait.
///
/// `is_valid` runs field-level cleaning on the wrapped [`BaseForm`], then
/// the form's own [`clean`](Form::clean) hook, and reports whether any error
/// was recorded.
#[async_trait]
pub trait Form: Send + Sync {
    /// The form name reported to clients.
    fn name(&self) -> &'static str;

    /// Returns the wrapped base form.
    fn base(&self) -> &BaseForm;

    /// Returns the wrapped base form mutably.
    fn base_mut(&mut self) -> &mut BaseForm;

    /// Cross-field validation hook. Record problems with
    /// [`BaseForm::add_error`]. The default does nothing.
    async fn clean(&mut self) {}

    /// Binds submitted data.
    fn bind(&mut self, data: &QueryDict) {
        self.base_mut().bind(data);
    }

    /// Validates the bound data. Unbound forms are never valid.
    async fn is_valid(&mut self) -> bool {
        if !self.base().is_bound() {
            return false;
        }
        self.base_mut().clean_fields();
        self.clean().await;
        self.base().errors().is_empty()
    }

    /// Returns the recorded errors.
    fn errors(&self) -> &FormErrors {
        self.base().errors()
    }

    /// Describes the form for a GET request.
    fn as_json(&self) -> serde_json::Value {
        json!({
            "form": self.name(),
            "fields": self.base().schema(),
        })
    }
}

/// A general-purpose form: fields, bound data, cleaned data and errors.
///
/// # Examples
///
/// ```
/// use userware_forms::{BaseForm, FormFieldDef, FormFieldType};
/// use userware_http::QueryDict;
///
/// let mut form = BaseForm::new(vec![
///     FormFieldDef::new("username", FormFieldType::char(Some(30))),
/// ]);
/// form.bind(&QueryDict::parse("username=+bob+"));
/// form.clean_fields();
/// assert_eq!(form.cleaned("username"), Some("bob"));
/// ```
#[derive(Debug, Clone)]
pub struct BaseForm {
    fields: Vec<FormFieldDef>,
    bound: bool,
    raw_data: HashMap<String, Option<String>>,
    cleaned_data: HashMap<String, String>,
    errors: FormErrors,
}

impl BaseForm {
    /// Creates an unbound form over the given fields.
    pub fn new(fields: Vec<FormFieldDef>) -> Self {
        Self {
            fields,
            bound: false,
            raw_data: HashMap::new(),
            cleaned_data: HashMap::new(),
            errors: FormErrors::new(),
        }
    }

    /// Returns the field definitions.
    pub fn fields(&self) -> &[FormFieldDef] {
        &self.fields
    }

    /// Returns the field named `name`.
    pub fn field(&self, name: &str) -> Option<&FormFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the field named `name` mutably.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut FormFieldDef> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Binds submitted data, discarding earlier results.
    pub fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.raw_data.clear();
        self.cleaned_data.clear();
        self.errors.clear();
        for field in &self.fields {
            self.raw_data
                .insert(field.name.clone(), data.get(&field.name).map(String::from));
        }
    }

    /// Returns `true` if data has been bound.
    pub const fn is_bound(&self) -> bool {
        self.bound
    }

    /// Runs field-level cleaning for every field.
    pub fn clean_fields(&mut self) {
        self.cleaned_data.clear();
        self.errors.clear();
        for field in &self.fields {
            let raw = self.raw_data.get(&field.name).and_then(|v| v.as_deref());
            match clean_field_value(field, raw) {
                Ok(value) => {
                    self.cleaned_data.insert(field.name.clone(), value);
                }
                Err(messages) => self.errors.extend(&field.name, messages),
            }
        }
    }

    /// Returns the cleaned value of `field`, if it passed field-level cleaning.
    pub fn cleaned(&self, field: &str) -> Option<&str> {
        self.cleaned_data.get(field).map(String::as_str)
    }

    /// Replaces the cleaned value of `field`.
    pub fn set_cleaned(&mut self, field: &str, value: impl Into<String>) {
        self.cleaned_data.insert(field.to_string(), value.into());
    }

    /// Records an error against `field`, or a form-level error when `None`.
    ///
    /// A field that gets an error loses its cleaned value.
    pub fn add_error(&mut self, field: Option<&str>, message: impl Into<String>) {
        match field {
            Some(name) => {
                self.cleaned_data.remove(name);
                self.errors.add(name, message);
            }
            None => self.errors.add_non_field(message),
        }
    }

    /// Returns the recorded errors.
    pub const fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Returns the schema of every field, in declaration order.
    pub fn schema(&self) -> Vec<FieldSchema> {
        self.fields.iter().map(FormFieldDef::schema).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;

    struct PasswordPair {
        base: BaseForm,
    }

    impl PasswordPair {
        fn new() -> Self {
            Self {
                base: BaseForm::new(vec![
                    FormFieldDef::new("password1", FormFieldType::password()),
                    FormFieldDef::new("password2", FormFieldType::password()),
                ]),
            }
        }
    }

    #[async_trait]
    impl Form for PasswordPair {
        fn name(&self) -> &'static str {
            "password_pair"
        }

        fn base(&self) -> &BaseForm {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseForm {
            &mut self.base
        }

        async fn clean(&mut self) {
            let (Some(a), Some(b)) = (self.base.cleaned("password1"), self.base.cleaned("password2"))
            else {
                return;
            };
            if a != b {
                self.base
                    .add_error(Some("password2"), "The two password fields didn't match.");
            }
        }
    }

    #[tokio::test]
    async fn test_unbound_form_is_invalid() {
        let mut form = PasswordPair::new();
        assert!(!form.is_valid().await);
        assert!(form.errors().is_empty());
    }

    #[tokio::test]
    async fn test_valid_form() {
        let mut form = PasswordPair::new();
        form.bind(&QueryDict::parse("password1=abc&password2=abc"));
        assert!(form.is_valid().await);
        assert_eq!(form.base().cleaned("password1"), Some("abc"));
    }

    #[tokio::test]
    async fn test_clean_hook_errors() {
        let mut form = PasswordPair::new();
        form.bind(&QueryDict::parse("password1=abc&password2=abd"));
        assert!(!form.is_valid().await);
        assert_eq!(
            form.errors().get("password2"),
            ["The two password fields didn't match."]
        );
        assert!(form.base().cleaned("password2").is_none());
    }

    #[tokio::test]
    async fn test_missing_fields_skip_clean_hook() {
        let mut form = PasswordPair::new();
        form.bind(&QueryDict::parse("password1=abc"));
        assert!(!form.is_valid().await);
        assert_eq!(form.errors().get("password2"), ["This field is required."]);
    }

    #[tokio::test]
    async fn test_rebind_clears_state() {
        let mut form = PasswordPair::new();
        form.bind(&QueryDict::parse("password1=a&password2=b"));
        assert!(!form.is_valid().await);
        form.bind(&QueryDict::parse("password1=a&password2=a"));
        assert!(form.errors().is_empty());
        assert!(form.is_valid().await);
    }

    #[test]
    fn test_as_json() {
        let form = PasswordPair::new();
        let json = form.as_json();
        assert_eq!(json["form"], "password_pair");
        assert_eq!(json["fields"][0]["name"], "password1");
        assert_eq!(json["fields"][1]["widget"], "password_input");
    }

    #[test]
    fn test_non_field_error() {
        let mut base = BaseForm::new(vec![]);
        base.add_error(None, "Login Failed.");
        assert_eq!(base.errors().non_field_errors(), ["Login Failed."]);
    }
}
