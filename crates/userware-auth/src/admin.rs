//! Admin descriptors.
//!
//! Only the configuration an admin panel would need is produced here: which
//! fields to show, filter and search on, and which forms edit an account.
//! The panel itself lives elsewhere. [`AdminRegistry`] is built once from
//! the settings and never changes afterwards.

use serde::Serialize;

use userware_core::Settings;

/// A named group of fields on the change or add page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fieldset {
    pub name: String,
    pub fields: Vec<String>,
    /// CSS classes, e.g. `"wide"`.
    pub classes: Vec<String>,
}

impl Fieldset {
    pub fn new(name: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(ToString::to_string).collect(),
            classes: Vec::new(),
        }
    }

    #[must_use]
    pub fn classes(mut self, classes: &[&str]) -> Self {
        self.classes = classes.iter().map(ToString::to_string).collect();
        self
    }
}

/// Admin configuration for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelAdmin {
    /// Registry key, e.g. `"auth.account"`.
    pub model: String,
    pub list_display: Vec<String>,
    pub list_filter: Vec<String>,
    pub search_fields: Vec<String>,
    /// Field names; a leading `-` sorts descending.
    pub ordering: Vec<String>,
    pub readonly_fields: Vec<String>,
    pub exclude: Vec<String>,
    pub fieldsets: Vec<Fieldset>,
    pub add_fieldsets: Vec<Fieldset>,
    pub date_hierarchy: Option<String>,
    /// Name of the form that edits an existing record.
    pub form: Option<String>,
    /// Name of the form that creates a record.
    pub add_form: Option<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl ModelAdmin {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            list_display: Vec::new(),
            list_filter: Vec::new(),
            search_fields: Vec::new(),
            ordering: Vec::new(),
            readonly_fields: Vec::new(),
            exclude: Vec::new(),
            fieldsets: Vec::new(),
            add_fieldsets: Vec::new(),
            date_hierarchy: None,
            form: None,
            add_form: None,
        }
    }

    #[must_use]
    pub fn list_display(mut self, fields: &[&str]) -> Self {
        self.list_display = strings(fields);
        self
    }

    #[must_use]
    pub fn list_filter(mut self, fields: &[&str]) -> Self {
        self.list_filter = strings(fields);
        self
    }

    #[must_use]
    pub fn search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = strings(fields);
        self
    }

    #[must_use]
    pub fn ordering(mut self, fields: &[&str]) -> Self {
        self.ordering = strings(fields);
        self
    }

    #[must_use]
    pub fn readonly_fields(mut self, fields: &[&str]) -> Self {
        self.readonly_fields = strings(fields);
        self
    }

    #[must_use]
    pub fn exclude(mut self, fields: &[&str]) -> Self {
        self.exclude = strings(fields);
        self
    }

    #[must_use]
    pub fn fieldsets(mut self, fieldsets: Vec<Fieldset>) -> Self {
        self.fieldsets = fieldsets;
        self
    }

    #[must_use]
    pub fn add_fieldsets(mut self, fieldsets: Vec<Fieldset>) -> Self {
        self.add_fieldsets = fieldsets;
        self
    }

    #[must_use]
    pub fn date_hierarchy(mut self, field: &str) -> Self {
        self.date_hierarchy = Some(field.to_string());
        self
    }

    #[must_use]
    pub fn form(mut self, form: &str) -> Self {
        self.form = Some(form.to_string());
        self
    }

    #[must_use]
    pub fn add_form(mut self, form: &str) -> Self {
        self.add_form = Some(form.to_string());
        self
    }
}

/// Registry key of the account admin.
pub const USER_ADMIN_KEY: &str = "auth.account";
/// Registry key of the stored-session admin.
pub const SESSION_ADMIN_KEY: &str = "sessions.session";

/// The account admin: identity, personal info, flags and dates.
pub fn user_admin() -> ModelAdmin {
    ModelAdmin::new(USER_ADMIN_KEY)
        .fieldsets(vec![
            Fieldset::new("Required info", &["username", "email", "password"]),
            Fieldset::new("Personal info", &["first_name", "last_name"]),
            Fieldset::new("Permissions", &["is_active", "is_staff", "is_superuser"]),
            Fieldset::new("Important dates", &["last_login", "date_joined"]),
        ])
        .add_fieldsets(vec![Fieldset::new(
            "Required info",
            &["username", "email", "password1", "password2"],
        )
        .classes(&["wide"])])
        .list_display(&["id", "username", "email", "first_name", "last_name", "is_staff"])
        .list_filter(&["is_staff", "is_superuser", "is_active"])
        .search_fields(&["first_name", "last_name", "username", "email", "id"])
        .ordering(&["username", "email"])
        .form("user_change")
        .add_form("user_creation")
}

/// The stored-session admin. Session data is shown decoded and read-only.
pub fn session_admin() -> ModelAdmin {
    ModelAdmin::new(SESSION_ADMIN_KEY)
        .list_display(&["session_key", "_session_data", "expire_date"])
        .readonly_fields(&["_session_data"])
        .exclude(&["session_data"])
        .date_hierarchy("expire_date")
}

/// The registered admin descriptors, keyed by model.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminRegistry {
    entries: Vec<ModelAdmin>,
}

impl AdminRegistry {
    /// Registers the account admin when `register_admin` is set, and the
    /// session admin when `register_db_session_admin` is set and sessions
    /// are database-backed.
    pub fn from_settings(settings: &Settings) -> Self {
        let rules = &settings.userware;
        let mut entries = Vec::new();
        if rules.register_admin {
            entries.push(user_admin());
        }
        if rules.register_db_session_admin && settings.uses_db_sessions() {
            entries.push(session_admin());
        }
        tracing::debug!(count = entries.len(), "Admin descriptors registered");
        Self { entries }
    }

    pub fn get(&self, model: &str) -> Option<&ModelAdmin> {
        self.entries.iter().find(|admin| admin.model == model)
    }

    /// Registered model keys, in registration order.
    pub fn models(&self) -> Vec<&str> {
        self.entries.iter().map(|admin| admin.model.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
