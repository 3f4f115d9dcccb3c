//! Session framework.
//!
//! This module provides the [`SessionBackend`] trait, the
//! [`InMemorySessionBackend`] used for development and tests, and
//! [`SessionMiddleware`], which loads the session named by the session cookie
//! on the way in and persists it on the way out.
//!
//! Views reach the session through the [`Session`] handle stored in the
//! request's extensions. The handle is shared: every clone of the request
//! observes the same data, so writes made by a view are saved by the
//! middleware when the response passes back through it.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::RwLock;

use userware_core::{Settings, UserwareError, UserwareResult};
use userware_http::{HttpRequest, HttpResponse};

use crate::middleware::Middleware;

/// Length of generated session keys.
const SESSION_KEY_LENGTH: usize = 32;

/// Data associated with a user session.
#[derive(Debug, Clone)]
pub struct SessionData {
    /// The unique session key identifying this session.
    pub session_key: String,
    /// The session data stored as a map of string keys to JSON values.
    pub data: HashMap<String, serde_json::Value>,
    /// The timestamp when this session expires.
    pub expire_date: DateTime<Utc>,
    /// Whether the session data has been modified since it was loaded.
    pub modified: bool,
}

impl SessionData {
    /// Creates a new empty session with the given key and a two-week lifetime.
    pub fn new(session_key: String) -> Self {
        Self::with_lifetime(session_key, Duration::weeks(2).num_seconds())
    }

    /// Creates a new empty session with a specified lifetime.
    pub fn with_lifetime(session_key: String, lifetime_seconds: i64) -> Self {
        Self {
            session_key,
            data: HashMap::new(),
            expire_date: Utc::now() + Duration::seconds(lifetime_seconds),
            modified: false,
        }
    }

    /// Gets a value from the session by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Sets a value in the session.
    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.data.insert(key.to_string(), value);
        self.modified = true;
    }

    /// Removes a value from the session.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        let result = self.data.remove(key);
        if result.is_some() {
            self.modified = true;
        }
        result
    }

    /// Returns `true` if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expire_date
    }

    /// Clears all data from the session.
    pub fn clear(&mut self) {
        self.data.clear();
        self.modified = true;
    }

    /// Returns the number of entries in the session data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the session data is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A backend for storing and retrieving session data.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Loads session data for the given session key.
    async fn load(&self, session_key: &str) -> UserwareResult<SessionData>;

    /// Saves session data and returns the session key.
    async fn save(&self, session: &SessionData) -> UserwareResult<String>;

    /// Deletes a session by its key.
    async fn delete(&self, session_key: &str) -> UserwareResult<()>;

    /// Checks whether a live session with the given key exists.
    async fn exists(&self, session_key: &str) -> UserwareResult<bool>;

    /// Removes all expired sessions.
    async fn clear_expired(&self) -> UserwareResult<()>;

    /// Deletes every session whose `key` entry equals `value`, sparing the
    /// session named by `keep`. Returns how many sessions were removed.
    async fn delete_where(
        &self,
        key: &str,
        value: &serde_json::Value,
        keep: Option<&str>,
    ) -> UserwareResult<usize>;
}

/// An in-memory session backend.
///
/// Clones share the same store. Sessions are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionBackend {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl InMemorySessionBackend {
    /// Creates a new in-memory session backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions, expired ones included.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionBackend for InMemorySessionBackend {
    async fn load(&self, session_key: &str) -> UserwareResult<SessionData> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_key)
            .filter(|s| !s.is_expired())
            .cloned()
            .map(|mut s| {
                s.modified = false;
                s
            })
            .ok_or_else(|| UserwareError::NotFound(format!("Session '{session_key}' not found")))
    }

    async fn save(&self, session: &SessionData) -> UserwareResult<String> {
        let key = session.session_key.clone();
        self.sessions
            .write()
            .await
            .insert(key.clone(), session.clone());
        Ok(key)
    }

    async fn delete(&self, session_key: &str) -> UserwareResult<()> {
        self.sessions.write().await.remove(session_key);
        Ok(())
    }

    async fn exists(&self, session_key: &str) -> UserwareResult<bool> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_key).is_some_and(|s| !s.is_expired()))
    }

    async fn clear_expired(&self) -> UserwareResult<()> {
        self.sessions
            .write()
            .await
            .retain(|_, session| !session.is_expired());
        Ok(())
    }

    async fn delete_where(
        &self,
        key: &str,
        value: &serde_json::Value,
        keep: Option<&str>,
    ) -> UserwareResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|session_key, session| {
            Some(session_key.as_str()) == keep || session.get(key) != Some(value)
        });
        Ok(before - sessions.len())
    }
}

#[derive(Debug)]
struct SessionState {
    data: SessionData,
    had_cookie: bool,
    stale_keys: Vec<String>,
}

/// A per-request handle to the current session.
///
/// Inserted into the request extensions by [`SessionMiddleware`]. All clones
/// refer to the same underlying state.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    fn attach(data: SessionData, had_cookie: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                data,
                had_cookie,
                stale_keys: Vec::new(),
            })),
        }
    }

    /// Creates a detached session, for use outside the middleware.
    pub fn detached() -> Self {
        Self::attach(SessionData::new(generate_session_key()), false)
    }

    /// Returns the session attached to `request`, if the session middleware ran.
    pub fn from_request(request: &HttpRequest) -> Option<Self> {
        request.extensions().get::<Self>().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current session key.
    pub fn session_key(&self) -> String {
        self.lock().data.session_key.clone()
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.lock().data.get(key).cloned()
    }

    /// Returns the string stored under `key`, if it is a string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.lock()
            .data
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string)
    }

    /// Returns `true` if a value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().data.data.contains_key(key)
    }

    /// Stores `value` under `key`.
    pub fn set(&self, key: &str, value: serde_json::Value) {
        self.lock().data.set(key, value);
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.lock().data.remove(key)
    }

    /// Returns `true` if the session holds no data.
    pub fn is_empty(&self) -> bool {
        self.lock().data.is_empty()
    }

    /// Returns `true` if the session was changed during this request.
    pub fn is_modified(&self) -> bool {
        self.lock().data.modified
    }

    /// Moves the data to a fresh key. The old key is deleted on save.
    pub fn cycle_key(&self) {
        let mut state = self.lock();
        let old = std::mem::replace(&mut state.data.session_key, generate_session_key());
        state.stale_keys.push(old);
        state.data.modified = true;
    }

    /// Discards all data and moves to a fresh key. The old key is deleted on save.
    pub fn flush(&self) {
        let mut state = self.lock();
        state.data.clear();
        let old = std::mem::replace(&mut state.data.session_key, generate_session_key());
        state.stale_keys.push(old);
    }

    fn take_for_save(&self) -> (SessionData, bool, Vec<String>) {
        let mut state = self.lock();
        let stale = std::mem::take(&mut state.stale_keys);
        (state.data.clone(), state.had_cookie, stale)
    }
}

/// Middleware that loads and saves sessions through a [`SessionBackend`].
pub struct SessionMiddleware {
    backend: Arc<dyn SessionBackend>,
    cookie_name: String,
    cookie_path: String,
    cookie_age: u64,
    cookie_httponly: bool,
    cookie_secure: bool,
    cookie_samesite: String,
}

impl std::fmt::Debug for SessionMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMiddleware")
            .field("cookie_name", &self.cookie_name)
            .field("cookie_age", &self.cookie_age)
            .finish_non_exhaustive()
    }
}

impl SessionMiddleware {
    /// Creates a new `SessionMiddleware` with the given backend and default
    /// cookie attributes.
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            cookie_name: "sessionid".to_string(),
            cookie_path: "/".to_string(),
            cookie_age: 1_209_600,
            cookie_httponly: true,
            cookie_secure: false,
            cookie_samesite: "Lax".to_string(),
        }
    }

    /// Creates a `SessionMiddleware` whose cookie follows `settings`.
    pub fn from_settings(backend: Arc<dyn SessionBackend>, settings: &Settings) -> Self {
        Self::new(backend)
            .with_cookie_name(&settings.session_cookie_name)
            .with_cookie_age(settings.session_cookie_age)
            .with_cookie_secure(settings.session_cookie_secure)
    }

    /// Sets the cookie name used for sessions.
    #[must_use]
    pub fn with_cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = name.to_string();
        self
    }

    /// Sets the cookie and session lifetime in seconds.
    #[must_use]
    pub const fn with_cookie_age(mut self, seconds: u64) -> Self {
        self.cookie_age = seconds;
        self
    }

    /// Sets whether the cookie should be marked as secure.
    #[must_use]
    pub const fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Returns the cookie name used for sessions.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Returns the session backend.
    pub fn backend(&self) -> Arc<dyn SessionBackend> {
        Arc::clone(&self.backend)
    }

    fn lifetime_seconds(&self) -> i64 {
        i64::try_from(self.cookie_age).unwrap_or(i64::MAX)
    }

    fn build_set_cookie(&self, session_key: &str, max_age: u64) -> String {
        let mut cookie = format!("{}={}", self.cookie_name, session_key);
        let _ = write!(cookie, "; Path={}; Max-Age={max_age}", self.cookie_path);
        if self.cookie_httponly {
            cookie.push_str("; HttpOnly");
        }
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        if !self.cookie_samesite.is_empty() {
            let _ = write!(cookie, "; SameSite={}", self.cookie_samesite);
        }
        cookie
    }

    fn with_cookie(&self, mut response: HttpResponse, session_key: &str, max_age: u64) -> HttpResponse {
        let cookie_value = self.build_set_cookie(session_key, max_age);
        if let Ok(header_value) = http::header::HeaderValue::from_str(&cookie_value) {
            response
                .headers_mut()
                .append(http::header::SET_COOKIE, header_value);
        }
        response
    }
}

#[async_trait]
impl Middleware for SessionMiddleware {
    async fn process_request(&self, request: &mut HttpRequest) -> Option<HttpResponse> {
        let loaded = match request.cookie(&self.cookie_name) {
            Some(key) => self.backend.load(key).await.ok(),
            None => None,
        };

        let session = loaded.map_or_else(
            || {
                Session::attach(
                    SessionData::with_lifetime(generate_session_key(), self.lifetime_seconds()),
                    false,
                )
            },
            |data| Session::attach(data, true),
        );
        request.extensions_mut().insert(session);
        None
    }

    async fn process_response(&self, request: &HttpRequest, response: HttpResponse) -> HttpResponse {
        let Some(session) = Session::from_request(request) else {
            return response;
        };
        let (mut data, had_cookie, stale_keys) = session.take_for_save();

        for key in &stale_keys {
            if let Err(e) = self.backend.delete(key).await {
                tracing::error!(error = %e, "failed to delete stale session");
            }
        }

        if data.is_empty() && !stale_keys.is_empty() {
            // Flushed with nothing left to keep: drop the browser cookie too.
            if had_cookie {
                return self.with_cookie(response, "", 0);
            }
            return response;
        }

        if data.modified || (!had_cookie && !data.is_empty()) {
            data.expire_date = Utc::now() + Duration::seconds(self.lifetime_seconds());
            data.modified = false;
            if let Err(e) = self.backend.save(&data).await {
                tracing::error!(error = %e, "failed to save session");
                return response;
            }
            return self.with_cookie(response, &data.session_key, self.cookie_age);
        }

        if had_cookie {
            return self.with_cookie(response, &data.session_key, self.cookie_age);
        }
        response
    }
}

/// Generates a random alphanumeric session key.
pub fn generate_session_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_KEY_LENGTH)
        .map(char::from)
        .collect()
}
