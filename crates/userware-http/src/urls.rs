//! Named route table.
//!
//! Routes are declared once at startup with [`path`] and collected into an
//! immutable [`Routes`] table that resolves incoming paths and reverses route
//! names into URLs. Route strings use `<converter:name>` placeholders:
//!
//! | Converter | Matches |
//! |---|---|
//! | `str` | any non-empty segment without `/` |
//! | `int` | one or more digits |
//! | `uidb64` | `[0-9A-Za-z]+` |
//! | `token` | `[0-9A-Za-z]{1,13}-[0-9A-Za-z]{1,64}` |

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use regex::Regex;

use userware_core::{UserwareError, UserwareResult};

use crate::{BoxFuture, HttpRequest};

/// The type for route handler functions.
pub type RouteHandler = Arc<dyn Fn(HttpRequest) -> BoxFuture + Send + Sync>;

/// The result of resolving a path against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverMatch {
    /// The name of the matched route.
    pub url_name: String,
    /// Values captured from the path placeholders.
    pub kwargs: HashMap<String, String>,
}

/// A single named route.
pub struct URLPattern {
    route: String,
    regex: Regex,
    name: String,
    params: Vec<(String, Regex)>,
    callback: RouteHandler,
}

impl fmt::Debug for URLPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("URLPattern")
            .field("route", &self.route)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl URLPattern {
    /// Returns the route string, relative to the table prefix.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Returns the route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the handler.
    pub const fn callback(&self) -> &RouteHandler {
        &self.callback
    }

    /// Matches a path (already stripped of the table prefix) in full.
    pub fn full_match(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        Some(
            self.params
                .iter()
                .filter_map(|(name, _)| {
                    captures
                        .name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }

    /// Builds this route's path from `kwargs`, validating each value.
    fn reverse(&self, kwargs: &HashMap<&str, &str>) -> UserwareResult<String> {
        let mut url = String::new();
        let mut remaining = self.route.as_str();
        let mut params = self.params.iter();

        while let Some(start) = remaining.find('<') {
            url.push_str(&remaining[..start]);
            let end = remaining[start..].find('>').map_or(remaining.len(), |e| e + start);
            let (name, check) = params.next().ok_or_else(|| {
                UserwareError::ConfigurationError(format!("Malformed route: {}", self.route))
            })?;
            let value = kwargs.get(name.as_str()).ok_or_else(|| {
                UserwareError::NotFound(format!(
                    "Reverse for '{}' is missing argument '{name}'",
                    self.name
                ))
            })?;
            if !check.is_match(value) {
                return Err(UserwareError::NotFound(format!(
                    "Reverse for '{}' rejected value '{value}' for '{name}'",
                    self.name
                )));
            }
            url.push_str(value);
            remaining = remaining.get(end + 1..).unwrap_or("");
        }
        url.push_str(remaining);
        Ok(url)
    }
}

fn converter_regex(converter: &str) -> UserwareResult<&'static str> {
    match converter {
        "str" => Ok("[^/]+"),
        "int" => Ok("[0-9]+"),
        "uidb64" => Ok("[0-9A-Za-z]+"),
        "token" => Ok("[0-9A-Za-z]{1,13}-[0-9A-Za-z]{1,64}"),
        other => Err(UserwareError::ConfigurationError(format!(
            "Unknown path converter: {other}"
        ))),
    }
}

/// Creates a named route.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use userware_http::urls::path;
/// use userware_http::{HttpRequest, HttpResponse};
///
/// let handler = Arc::new(|_req: HttpRequest| -> userware_http::BoxFuture {
///     Box::pin(async { HttpResponse::ok("set new password") })
/// });
/// let pattern = path("password/reset/set/new/<uidb64:uidb64>-<token:token>/", handler, "reset").unwrap();
/// let kwargs = pattern.full_match("password/reset/set/new/MQ-abc-0f3e/").unwrap();
/// assert_eq!(kwargs["uidb64"], "MQ");
/// assert_eq!(kwargs["token"], "abc-0f3e");
/// ```
pub fn path(route: &str, callback: RouteHandler, name: &str) -> UserwareResult<URLPattern> {
    let mut regex_str = String::from("^");
    let mut params = Vec::new();
    let mut remaining = route;

    while let Some(start) = remaining.find('<') {
        regex_str.push_str(&regex::escape(&remaining[..start]));
        let end = remaining[start..].find('>').ok_or_else(|| {
            UserwareError::ConfigurationError(format!("Unclosed angle bracket in route: {route}"))
        })? + start;

        let inner = &remaining[start + 1..end];
        let (converter, param) = inner.split_once(':').unwrap_or(("str", inner));
        let pattern = converter_regex(converter)?;
        write!(regex_str, "(?P<{param}>{pattern})").ok();

        let check = Regex::new(&format!("^{pattern}$"))
            .map_err(|e| UserwareError::ConfigurationError(e.to_string()))?;
        params.push((param.to_string(), check));
        remaining = &remaining[end + 1..];
    }
    regex_str.push_str(&regex::escape(remaining));
    regex_str.push('$');

    let regex = Regex::new(&regex_str).map_err(|e| {
        UserwareError::ConfigurationError(format!("Invalid route '{route}': {e}"))
    })?;

    Ok(URLPattern {
        route: route.to_string(),
        regex,
        name: name.to_string(),
        params,
        callback,
    })
}

/// An immutable table of named routes under a common prefix.
///
/// Built once at startup; lookups never mutate it.
pub struct Routes {
    prefix: String,
    patterns: Vec<URLPattern>,
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routes")
            .field("prefix", &self.prefix)
            .field("patterns", &self.patterns)
            .finish()
    }
}

impl Routes {
    /// Creates a route table. The prefix is normalized to start and end with `/`.
    ///
    /// Fails if two patterns share a name.
    pub fn new(prefix: &str, patterns: Vec<URLPattern>) -> UserwareResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for pattern in &patterns {
            if !seen.insert(pattern.name()) {
                return Err(UserwareError::ConfigurationError(format!(
                    "Duplicate route name: {}",
                    pattern.name()
                )));
            }
        }

        let trimmed = prefix.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        };
        Ok(Self { prefix, patterns })
    }

    /// Returns the mount prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the patterns in declaration order.
    pub fn patterns(&self) -> &[URLPattern] {
        &self.patterns
    }

    /// Resolves a full request path to a pattern and its captured values.
    pub fn resolve(&self, path: &str) -> Option<(&URLPattern, ResolverMatch)> {
        let relative = path.strip_prefix(&self.prefix)?;
        self.patterns.iter().find_map(|pattern| {
            pattern.full_match(relative).map(|kwargs| {
                (
                    pattern,
                    ResolverMatch {
                        url_name: pattern.name().to_string(),
                        kwargs,
                    },
                )
            })
        })
    }

    /// Builds the full URL for a named route.
    pub fn reverse(&self, name: &str, kwargs: &HashMap<&str, &str>) -> UserwareResult<String> {
        let pattern = self
            .patterns
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| UserwareError::NotFound(format!("Reverse for '{name}' not found")))?;
        Ok(format!("{}{}", self.prefix, pattern.reverse(kwargs)?))
    }
}
