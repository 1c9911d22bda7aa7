//! Token storage consumed by the sync core.
//!
//! The login flow lives outside this crate; it deposits a `token` cookie for
//! the team path and the core only reads it back through [`TokenStore`].

use std::sync::{Mutex, PoisonError};

use crate::urls::{ServerUrls, TEAM_PATH};

pub const TOKEN_COOKIE: &str = "token";

/// Lookup of the bearer token for a full team URL.
pub trait TokenStore: Send + Sync {
    fn token_for(&self, full_url: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub path: String,
    pub name: String,
    pub value: String,
}

impl Cookie {
    fn full_url(&self) -> String {
        format!("{}{}", self.domain, self.path)
    }
}

/// In-memory cookie storage keyed by `(domain, path, name)`.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<Cookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cookie, replacing any with the same domain, path and name.
    pub fn set_cookie(&self, domain: &str, path: &str, name: &str, value: &str) {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.retain(|c| !(c.domain == domain && c.path == path && c.name == name));
        cookies.push(Cookie {
            domain: domain.to_string(),
            path: path.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// Store the team token where [`CookieJar::token_for`] will find it.
    pub fn set_team_token(&self, urls: &ServerUrls, team: &str, token: &str) {
        self.set_cookie(urls.base(), &format!("{}{}", TEAM_PATH, team), TOKEN_COOKIE, token);
    }

    /// Find a cookie named `name`.
    ///
    /// With neither `value` nor `full_url`, the first cookie with that name
    /// wins. With a `value`, both the value and `domain + path` must match
    /// `full_url`. Otherwise only `domain + path` must match.
    pub fn search(&self, value: Option<&str>, full_url: Option<&str>, name: &str) -> Option<Cookie> {
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies
            .iter()
            .filter(|c| c.name == name)
            .find(|c| match (value, full_url) {
                (None, None) => true,
                (Some(v), url) => c.value == v && url == Some(c.full_url().as_str()),
                (None, Some(url)) => c.full_url() == url,
            })
            .cloned()
    }

    pub fn clear(&self) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl TokenStore for CookieJar {
    fn token_for(&self, full_url: &str) -> Option<String> {
        self.search(None, Some(full_url), TOKEN_COOKIE)
            .map(|c| c.value)
    }
}

/// A store holding one fixed token, for callers that already have it.
#[derive(Debug, Clone)]
pub struct StaticToken(pub Option<String>);

impl TokenStore for StaticToken {
    fn token_for(&self, _full_url: &str) -> Option<String> {
        self.0.clone()
    }
}
