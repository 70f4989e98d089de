//! Session cookie store.
//!
//! LeanKit keeps a server-side session keyed by one cookie. The store parses
//! every `Set-Cookie` header it is shown, keeps the latest record per cookie
//! name, and replays only the session cookie on outgoing requests.
//!
//! Expiry attributes are recorded but never enforced: a cookie is only ever
//! replaced by a newer one with the same name.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use reqwest::header::{COOKIE, HeaderMap, HeaderValue, SET_COOKIE};
use tracing::{debug, trace};

/// Attribute keys understood by the parser; everything else is dropped.
const KNOWN_ATTRIBUTES: &[&str] = &["expires", "secure", "httponly", "domain", "max-age", "path"];

/// One parsed `Set-Cookie` record.
///
/// The value is redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    pub name: String,
    value: String,
    /// The `name=value;` pair replayed in the `Cookie` header.
    pub pair: String,
    /// Raw `Expires` attribute.
    pub expires: Option<String>,
    /// `Expires` as an absolute time, when it parses as an HTTP date.
    pub expires_at: Option<SystemTime>,
    /// Raw `Max-Age` attribute.
    pub max_age: Option<String>,
    /// Creation time plus `Max-Age` seconds.
    pub max_age_expires_at: Option<SystemTime>,
    /// `Secure` flag.
    pub secure: bool,
    /// `HttpOnly` flag.
    pub http_only: bool,
    /// `Domain` attribute.
    pub domain: Option<String>,
    /// `Path` attribute.
    pub path: Option<String>,
    /// When the record was parsed.
    pub created_at: SystemTime,
}

impl SessionCookie {
    /// Parses one `Set-Cookie` header value.
    ///
    /// Returns `None` when the leading `name=value` pair has no name.
    #[must_use]
    pub fn parse(raw: &str, created_at: SystemTime) -> Option<Self> {
        let mut parts = raw.split(';');
        let primary = parts.next()?.trim();
        let (name, value) = primary.split_once('=').unwrap_or((primary, ""));
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            pair: format!("{primary};"),
            expires: None,
            expires_at: None,
            max_age: None,
            max_age_expires_at: None,
            secure: false,
            http_only: false,
            domain: None,
            path: None,
            created_at,
        };

        for token in parts {
            let (key, attr_value) = match token.split_once('=') {
                Some((key, value)) => (key.trim().to_ascii_lowercase(), Some(value.trim())),
                None => (token.trim().to_ascii_lowercase(), None),
            };
            if !KNOWN_ATTRIBUTES.contains(&key.as_str()) {
                if !key.is_empty() {
                    trace!(attribute = %key, "dropping unknown cookie attribute");
                }
                continue;
            }
            cookie.apply_attribute(&key, attr_value);
        }

        cookie.expires_at = cookie
            .expires
            .as_deref()
            .and_then(|v| httpdate::parse_http_date(v).ok());
        cookie.max_age_expires_at = cookie
            .max_age
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
            .map(|secs| {
                u64::try_from(secs)
                    .ok()
                    .and_then(|secs| created_at.checked_add(Duration::from_secs(secs)))
                    .unwrap_or(created_at)
            });

        Some(cookie)
    }

    fn apply_attribute(&mut self, key: &str, value: Option<&str>) {
        match (key, value) {
            ("secure", _) => self.secure = true,
            ("httponly", _) => self.http_only = true,
            ("expires", Some(v)) => self.expires = Some(v.to_string()),
            ("max-age", Some(v)) => self.max_age = Some(v.to_string()),
            ("domain", Some(v)) => self.domain = Some(v.to_string()),
            ("path", Some(v)) => self.path = Some(v.to_string()),
            // Valued attribute written as a bare flag: nothing to record.
            _ => {}
        }
    }

    /// Returns the cookie value.
    ///
    /// Session ids are credentials: avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("expires", &self.expires)
            .field("max_age", &self.max_age)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Cookie records keyed by name, plus the name of the session cookie to replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieStore {
    session_name: String,
    cookies: HashMap<String, SessionCookie>,
}

impl CookieStore {
    /// Creates an empty store that replays the cookie called `session_name`.
    #[must_use]
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            cookies: HashMap::new(),
        }
    }

    /// Absorbs every `Set-Cookie` header in `headers`.
    pub fn absorb(&mut self, headers: &HeaderMap) {
        self.absorb_at(headers, SystemTime::now());
    }

    /// Absorbs every `Set-Cookie` header, stamping records with `now`.
    ///
    /// A record with the same name as an existing one replaces it outright.
    pub fn absorb_at(&mut self, headers: &HeaderMap, now: SystemTime) {
        for raw in headers.get_all(SET_COOKIE) {
            let Ok(raw) = raw.to_str() else {
                debug!("skipping non-ASCII Set-Cookie header");
                continue;
            };
            if let Some(cookie) = SessionCookie::parse(raw, now) {
                debug!(name = %cookie.name, "stored cookie");
                self.cookies.insert(cookie.name.clone(), cookie);
            }
        }
    }

    /// Sets the `Cookie` header to the stored session cookie, if there is one.
    pub fn render(&self, headers: &mut HeaderMap) {
        let Some(cookie) = self.session() else {
            return;
        };
        match HeaderValue::from_str(&cookie.pair) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(COOKIE, value);
            }
            Err(_) => debug!(name = %cookie.name, "session cookie not representable as header"),
        }
    }

    /// Returns the stored session cookie.
    #[must_use]
    pub fn session(&self) -> Option<&SessionCookie> {
        self.cookies.get(&self.session_name)
    }

    /// Returns the record for any cookie name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SessionCookie> {
        self.cookies.get(name)
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true when nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
