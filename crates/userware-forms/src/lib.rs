//! # userware-forms
//!
//! Form handling for the account views. A form is a list of
//! [`FormFieldDef`]s plus form-level checks:
//!
//! - [`fields`] - Field types and per-field cleaning
//! - [`validators`] - Email validation and the email-shape test
//! - [`errors`] - [`FormErrors`], keyed by field name or `__all__`
//! - [`form`] - The [`Form`] trait and [`BaseForm`]
//!
//! Validation runs in two phases. Field-level cleaning strips, length-checks
//! and pattern-checks each value; the async [`Form::clean`] hook then runs
//! cross-field and directory-backed checks. Errors accumulate rather than
//! short-circuiting.

pub mod errors;
pub mod fields;
pub mod form;
pub mod validators;

pub use errors::{FormErrors, NON_FIELD_ERRORS};
pub use fields::{FieldSchema, FormFieldDef, FormFieldType, WidgetType};
pub use form::{BaseForm, Form};
