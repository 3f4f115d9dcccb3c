//! Redirect target and host validation.

use url::Url;

/// Returns `true` if `target` is safe to redirect to from a page served on `host`.
///
/// Relative paths are safe. Absolute URLs must use `http` or `https` and
/// point at `host`. Scheme-relative (`//evil.com`) and backslash-smuggled
/// (`/\evil.com`) targets are rejected, as is anything containing control
/// characters.
///
/// # Examples
///
/// ```
/// use userware_http::utils::is_safe_url;
///
/// assert!(is_safe_url("/account/", "example.com"));
/// assert!(is_safe_url("https://example.com/home/", "example.com"));
/// assert!(!is_safe_url("https://evil.com/", "example.com"));
/// assert!(!is_safe_url("//evil.com/", "example.com"));
/// ```
pub fn is_safe_url(target: &str, host: &str) -> bool {
    let target = target.trim();
    if target.is_empty() || target.chars().any(char::is_control) {
        return false;
    }

    let normalized = target.replace('\\', "/");
    if normalized.starts_with("//") {
        return false;
    }

    match Url::parse(&normalized) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                return false;
            }
            let Some(url_host) = url.host_str() else {
                return false;
            };
            let authority = url
                .port()
                .map_or_else(|| url_host.to_string(), |port| format!("{url_host}:{port}"));
            authority.eq_ignore_ascii_case(host)
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => !normalized.contains(':')
            || normalized.find(':') > normalized.find('/'),
        Err(_) => false,
    }
}

/// Returns `host` without its port. Bracketed IPv6 literals keep their brackets.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':').map_or(host, |(domain, _)| domain)
}

/// Returns `true` if `host` (a `Host` header value) matches `allowed_hosts`.
///
/// Entries match case-insensitively and ignore the port. `"*"` matches
/// anything, and an entry starting with `.` matches that domain and all of
/// its subdomains. An empty list matches nothing.
///
/// # Examples
///
/// ```
/// use userware_http::utils::is_allowed_host;
///
/// let allowed = vec![".example.com".to_string()];
/// assert!(is_allowed_host("example.com:8000", &allowed));
/// assert!(is_allowed_host("www.example.com", &allowed));
/// assert!(!is_allowed_host("evilexample.com", &allowed));
/// ```
pub fn is_allowed_host(host: &str, allowed_hosts: &[String]) -> bool {
    if host.is_empty() || host.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return false;
    }
    let domain = strip_port(host).to_ascii_lowercase();
    allowed_hosts.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        if allowed == "*" {
            return true;
        }
        allowed.strip_prefix('.').map_or_else(
            || domain == allowed,
            |suffix| domain == suffix || domain.ends_with(&allowed),
        )
    })
}
