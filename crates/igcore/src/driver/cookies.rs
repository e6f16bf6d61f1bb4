//! Session cookies loaded from disk and injected into browser sessions.
//!
//! Two formats are accepted:
//! - a JSON array as exported by browser extensions (`[{"name": ..., "value": ..., "domain": ...}]`)
//! - a Netscape HTTP Cookie File (tab separated, seven columns)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Cookie that carries the logged-in session
pub const SESSION_COOKIE_NAME: &str = "sessionid";

/// Marker left in sample cookie files that were never filled in
const PLACEHOLDER_MARKER: &str = "YOUR_";

#[derive(Error, Debug)]
pub enum CookieError {
    #[error("failed to read cookies file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cookies JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized cookies format")]
    UnknownFormat,
}

/// A cookie to inject before navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    #[serde(alias = "key")]
    pub name: String,
    pub value: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Unix timestamp; `None` for session cookies
    #[serde(default, alias = "expirationDate", skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

fn default_domain() -> String {
    ".instagram.com".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

impl SessionCookie {
    /// Get masked value (for security - show only first and last few chars)
    pub fn masked_value(&self) -> String {
        let chars: Vec<char> = self.value.chars().collect();
        let len = chars.len();
        if len <= 8 {
            "*".repeat(len)
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[len - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }

    fn is_placeholder(&self) -> bool {
        self.value.contains(PLACEHOLDER_MARKER)
    }
}

/// Cookies parsed from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieJar {
    cookies: Vec<SessionCookie>,
}

impl CookieJar {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self { cookies }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn session_cookie(&self) -> Option<&SessionCookie> {
        self.cookies.iter().find(|c| c.name == SESSION_COOKIE_NAME)
    }

    /// A jar is only worth injecting when it holds a real `sessionid`.
    pub fn is_usable(&self) -> bool {
        self.session_cookie().map(|c| !c.is_placeholder()).unwrap_or(false)
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    /// Cookies to inject, or nothing when the jar is not usable.
    pub fn into_usable(self) -> Vec<SessionCookie> {
        if self.is_usable() {
            self.cookies
        } else {
            Vec::new()
        }
    }
}

/// Parse cookie file content, detecting the format from the first non-blank character.
pub fn parse_cookies(content: &str) -> Result<CookieJar, CookieError> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let cookies: Vec<SessionCookie> = serde_json::from_str(trimmed)?;
        return Ok(CookieJar::new(cookies));
    }
    if trimmed.is_empty() {
        return Ok(CookieJar::default());
    }

    let cookies = parse_netscape(trimmed);
    if cookies.is_empty() && !trimmed.starts_with('#') {
        return Err(CookieError::UnknownFormat);
    }
    Ok(CookieJar::new(cookies))
}

/// Parse a Netscape cookie file, keeping only well-formed lines.
fn parse_netscape(content: &str) -> Vec<SessionCookie> {
    let mut cookies = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        // `#HttpOnly_` prefixed lines are real cookies, other `#` lines are comments
        let (line, http_only) = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => (rest, true),
            None if line.is_empty() || line.starts_with('#') => continue,
            None => (line, false),
        };

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 7 {
            continue;
        }

        let expires = parts[4].parse::<f64>().ok().filter(|ts| *ts > 0.0);
        cookies.push(SessionCookie {
            domain: parts[0].to_string(),
            path: parts[2].to_string(),
            secure: parts[3].eq_ignore_ascii_case("TRUE"),
            expires,
            name: parts[5].to_string(),
            value: parts[6].to_string(),
            http_only,
        });
    }

    cookies
}

/// Read and parse a cookies file.
pub fn load_cookie_file(path: &Path) -> Result<CookieJar, CookieError> {
    let content = std::fs::read_to_string(path)?;
    parse_cookies(&content)
}

/// Cookies worth injecting from `path`; empty when missing, invalid or placeholder.
pub fn load_session_cookies(path: &Path) -> Vec<SessionCookie> {
    if !path.exists() {
        log::debug!("No cookies file at {}", path.display());
        return Vec::new();
    }

    match load_cookie_file(path) {
        Ok(jar) if jar.is_usable() => {
            log::info!("Loaded {} session cookies from {}", jar.len(), path.display());
            jar.into_usable()
        }
        Ok(_) => {
            log::warn!("Cookies file {} has no valid sessionid, ignoring", path.display());
            Vec::new()
        }
        Err(e) => {
            log::error!("Cookie error for {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_parse_json_cookies() {
        let content = r#"[
            {"name": "sessionid", "value": "12345%3Aabcdefgh%3A1", "domain": ".instagram.com", "httpOnly": true},
            {"name": "csrftoken", "value": "xyz789", "domain": ".instagram.com", "path": "/", "secure": true}
        ]"#;
        let jar = parse_cookies(content).unwrap();
        assert_eq!(jar.len(), 2);
        assert!(jar.is_usable());
        let session = jar.session_cookie().unwrap();
        assert!(session.http_only);
        assert_eq!(session.path, "/");
    }

    #[test]
    fn test_json_cookie_key_alias_and_default_domain() {
        let content = r#"[{"key": "sessionid", "value": "abc"}]"#;
        let jar = parse_cookies(content).unwrap();
        let cookie = jar.session_cookie().unwrap();
        assert_eq!(cookie.domain, ".instagram.com");
    }

    #[test]
    fn test_placeholder_session_is_not_usable() {
        let content = r#"[{"name": "sessionid", "value": "YOUR_SESSION_ID", "domain": ".instagram.com"}]"#;
        let jar = parse_cookies(content).unwrap();
        assert!(jar.session_cookie().is_some());
        assert!(!jar.is_usable());
        assert!(jar.into_usable().is_empty());
    }

    #[test]
    fn test_missing_session_is_not_usable() {
        let content = r#"[{"name": "csrftoken", "value": "xyz", "domain": ".instagram.com"}]"#;
        assert!(!parse_cookies(content).unwrap().is_usable());
    }

    #[test]
    fn test_parse_netscape_cookies() {
        let content = "# Netscape HTTP Cookie File\n\
            .instagram.com\tTRUE\t/\tTRUE\t9999999999\tsessionid\tabc123\n\
            #HttpOnly_.instagram.com\tTRUE\t/\tTRUE\t0\tds_user_id\t42\n\
            broken line\n";
        let jar = parse_cookies(content).unwrap();
        assert_eq!(jar.len(), 2);
        let session = jar.session_cookie().unwrap();
        assert_eq!(session.value, "abc123");
        assert!(session.secure);
        assert_eq!(session.expires, Some(9999999999.0));
        assert!(jar.cookies()[1].http_only);
        assert_eq!(jar.cookies()[1].expires, None);
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!(parse_cookies("hello world"), Err(CookieError::UnknownFormat)));
        assert!(parse_cookies("   ").unwrap().is_empty());
    }

    #[test]
    fn test_masked_value() {
        let cookie = SessionCookie {
            name: "sessionid".into(),
            value: "1234567890abcdef".into(),
            domain: ".instagram.com".into(),
            path: "/".into(),
            secure: true,
            http_only: true,
            expires: None,
        };
        assert_eq!(cookie.masked_value(), "1234...cdef");

        let short = SessionCookie {
            value: "abc".into(),
            ..cookie
        };
        assert_eq!(short.masked_value(), "***");
    }

    #[test]
    fn test_load_session_cookies_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "sessionid", "value": "real-session", "domain": ".instagram.com"}}]"#
        )
        .unwrap();
        let cookies = load_session_cookies(file.path());
        assert_eq!(cookies.len(), 1);

        assert!(load_session_cookies(Path::new("/definitely/not/here.json")).is_empty());
    }
}
