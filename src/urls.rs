//! Server URL handling.
//!
//! The configured base URL is normalized once into [`ServerUrls`], which is
//! then passed explicitly to the fetch service and the realtime adapter.

use serde::{Deserialize, Serialize};

pub const LOGIN_PATH: &str = "api/team/login";
pub const TEAM_PATH: &str = "api/team/";
pub const FEEDBACK_PATH: &str = "api/feedback";
const WS_ENDPOINT: &str = "websocket/websocket";

/// Normalized server location: scheme present, trailing slash, lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct ServerUrls {
    base: String,
}

impl ServerUrls {
    pub fn new(base_url: &str) -> Self {
        let mut base = base_url.trim().to_string();
        if !base.contains("://") {
            base = format!("http://{}", base);
        }
        if !base.ends_with('/') {
            base.push('/');
        }
        Self {
            base: base.to_lowercase(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn login(&self) -> String {
        format!("{}{}", self.base, LOGIN_PATH)
    }

    pub fn feedback(&self) -> String {
        format!("{}{}", self.base, FEEDBACK_PATH)
    }

    /// `{base}api/team/{team}` with the team exactly as given.
    pub fn team(&self, team: &str) -> String {
        format!("{}{}{}", self.base, TEAM_PATH, team)
    }

    /// WebSocket endpoint: `wss` for secure schemes, `ws` otherwise.
    pub fn websocket(&self) -> String {
        match self.base.split_once(':') {
            Some((scheme, rest)) => {
                let ws_scheme = if scheme.contains('s') { "wss" } else { "ws" };
                format!("{}:{}{}", ws_scheme, rest, WS_ENDPOINT)
            }
            None => String::new(),
        }
    }
}

impl From<String> for ServerUrls {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<ServerUrls> for String {
    fn from(value: ServerUrls) -> Self {
        value.base
    }
}

impl std::fmt::Display for ServerUrls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base)
    }
}
