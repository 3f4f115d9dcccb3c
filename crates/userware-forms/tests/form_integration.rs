//! Integration tests: a small sign-up form built from the public API.

use async_trait::async_trait;
use regex::Regex;

use userware_forms::{BaseForm, Form, FormFieldDef, FormFieldType};
use userware_http::QueryDict;

struct SignupForm {
    base: BaseForm,
    taken: Vec<&'static str>,
}

impl SignupForm {
    fn new(taken: Vec<&'static str>) -> Self {
        Self {
            base: BaseForm::new(vec![
                FormFieldDef::new(
                    "username",
                    FormFieldType::Regex {
                        regex: Regex::new(r"^[a-zA-Z0-9]+(-[a-zA-Z0-9]+)*$").unwrap(),
                        min_length: Some(3),
                        max_length: Some(32),
                    },
                ),
                FormFieldDef::new("email", FormFieldType::Email { max_length: None }),
            ]),
            taken,
        }
    }
}

#[async_trait]
impl Form for SignupForm {
    fn name(&self) -> &'static str {
        "signup"
    }

    fn base(&self) -> &BaseForm {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseForm {
        &mut self.base
    }

    async fn clean(&mut self) {
        let taken = self
            .base
            .cleaned("username")
            .is_some_and(|u| self.taken.iter().any(|t| t.eq_ignore_ascii_case(u)));
        if taken {
            self.base
                .add_error(Some("username"), "A user with that username already exists.");
        }
    }
}

// ═════════════════════════════════════════════════════════════════════
// 1. Field and form errors combine
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_errors_from_both_phases() {
    let mut form = SignupForm::new(vec!["alice"]);
    form.bind(&QueryDict::parse("username=ALICE&email=not-an-email"));
    assert!(!form.is_valid().await);

    let json = serde_json::to_value(form.errors()).unwrap();
    assert_eq!(json["username"][0], "A user with that username already exists.");
    assert_eq!(json["email"][0], "Enter a valid email address.");
}

// ═════════════════════════════════════════════════════════════════════
// 2. Clean data
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_valid_submission() {
    let mut form = SignupForm::new(vec!["alice"]);
    form.bind(&QueryDict::parse("username=bob&email=bob%40x.com"));
    assert!(form.is_valid().await);
    assert_eq!(form.base().cleaned("email"), Some("bob@x.com"));
}

// ═════════════════════════════════════════════════════════════════════
// 3. Schema
// ═════════════════════════════════════════════════════════════════════

#[test]
fn test_schema_lists_fields_in_order() {
    let form = SignupForm::new(vec![]);
    let json = form.as_json();
    let names: Vec<&str> = json["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["username", "email"]);
}
