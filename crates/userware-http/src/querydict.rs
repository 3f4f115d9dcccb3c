//! Query string and form data dictionary.
//!
//! [`QueryDict`] holds the decoded `key=value` pairs of a query string or an
//! `application/x-www-form-urlencoded` body. A key may carry several values;
//! [`get`](QueryDict::get) returns the last one.

use std::collections::HashMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

/// An ordered multi-value dictionary for query string and form data.
///
/// # Examples
///
/// ```
/// use userware_http::QueryDict;
///
/// let qd = QueryDict::parse("username=alice&next=%2Faccount%2F&tag=a&tag=b");
/// assert_eq!(qd.get("username"), Some("alice"));
/// assert_eq!(qd.get("next"), Some("/account/"));
/// assert_eq!(qd.get_list("tag"), vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    keys: Vec<String>,
    values: HashMap<String, Vec<String>>,
}

impl QueryDict {
    /// Creates a new, empty `QueryDict`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a URL-encoded string (e.g. `"key1=val1&key2=val2"`).
    ///
    /// `+` decodes to a space and percent escapes are decoded as UTF-8,
    /// replacing invalid sequences.
    pub fn parse(encoded: &str) -> Self {
        let mut dict = Self::new();
        for pair in encoded.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            dict.append(&decode(key), &decode(value));
        }
        dict
    }

    /// Builds a `QueryDict` from key/value pairs.
    pub fn from_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Self {
        let mut dict = Self::new();
        for (key, value) in pairs {
            dict.append(key.as_ref(), value.as_ref());
        }
        dict
    }

    /// Returns the last value for the given key, or `None` if not present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Returns all values for the given key, in submission order.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.values
            .get(key)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns `true` if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Replaces all values for `key` with a single value.
    pub fn set(&mut self, key: &str, value: &str) {
        if !self.values.contains_key(key) {
            self.keys.push(key.to_string());
        }
        self.values.insert(key.to_string(), vec![value.to_string()]);
    }

    /// Appends a value to the list for `key`.
    pub fn append(&mut self, key: &str, value: &str) {
        if !self.values.contains_key(key) {
            self.keys.push(key.to_string());
        }
        self.values
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// Returns the keys in first-insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Returns `true` if the dictionary has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Encodes the dictionary back into a URL-encoded string.
    pub fn urlencode(&self) -> String {
        let mut parts = Vec::new();
        for key in &self.keys {
            for value in &self.values[key] {
                parts.push(format!("{}={}", encode(key), encode(value)));
            }
        }
        parts.join("&")
    }
}

/// Percent-encodes a single query component.
pub fn encode(component: &str) -> String {
    utf8_percent_encode(component, NON_ALPHANUMERIC).to_string()
}

fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
