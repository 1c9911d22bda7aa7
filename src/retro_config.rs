//! Configuration for the RetroQuest sync client.
//!
//! Settings are read from `retroquest.toml` and layered:
//! 1. the TOML file (default location under the user config directory)
//! 2. environment variables (`RETROQUEST_BASE_URL`, `RETROQUEST_TEAM`,
//!    `RETROQUEST_TOKEN`), including a `.env` file loaded at startup
//! 3. CLI flags
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! base_url = "https://retroquest.example.com/"
//!
//! [session]
//! team = "The Avengers"
//! token = "eyJhbGciOi..."
//!
//! [logging]
//! format = "pretty"   # or "json"
//! level = "info"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::credentials::{CookieJar, StaticToken, TokenStore};
use crate::urls::ServerUrls;

pub const CONFIG_FILE: &str = "retroquest.toml";
pub const ENV_BASE_URL: &str = "RETROQUEST_BASE_URL";
pub const ENV_TEAM: &str = "RETROQUEST_TEAM";
pub const ENV_TOKEN: &str = "RETROQUEST_TOKEN";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: pretty, json", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Backend base URL; normalized before use
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8080/".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    /// Team name as entered at login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Token issued by the login endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

/// Contents of `retroquest.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetroToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl RetroToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse retroquest.toml")
    }

    /// Load `path`, or defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize retroquest.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.base_url.trim().is_empty() {
            warnings.push("server.base_url is empty".to_string());
        } else {
            let normalized = ServerUrls::new(&self.server.base_url);
            if url::Url::parse(normalized.base()).is_err() {
                warnings.push(format!(
                    "Invalid server.base_url '{}': not a valid URL once normalized",
                    self.server.base_url
                ));
            }
        }

        if let Some(team) = &self.session.team
            && team.trim().is_empty()
        {
            warnings.push("session.team is set but empty".to_string());
        }

        if self.session.token.is_some() && self.session.team.is_none() {
            warnings.push("session.token is set without session.team".to_string());
        }

        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            warnings.push(format!(
                "Invalid logging.level '{}': not a valid filter directive",
                self.logging.level
            ));
        }

        warnings
    }
}

/// Default config file location: `<config dir>/retroquest/retroquest.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("retroquest").join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolved configuration.
///
/// Merges settings from:
/// 1. retroquest.toml
/// 2. Environment variables
/// 3. CLI arguments
#[derive(Debug, Clone)]
pub struct RetroConfig {
    /// Where the TOML file was (or would be) read from
    pub path: PathBuf,
    pub toml: RetroToml,
    pub cli_base_url: Option<String>,
    pub cli_team: Option<String>,
    pub cli_token: Option<String>,
}

impl RetroConfig {
    /// Load from `path`, or from [`default_config_path`] when `None`.
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(default_config_path);
        let toml = RetroToml::load_or_default(&path)?;
        Ok(Self {
            path,
            toml,
            cli_base_url: None,
            cli_team: None,
            cli_token: None,
        })
    }

    /// Create RetroConfig with CLI overrides.
    pub fn with_cli_args(
        path: Option<PathBuf>,
        base_url: Option<String>,
        team: Option<String>,
        token: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::new(path)?;
        config.cli_base_url = base_url;
        config.cli_team = team;
        config.cli_token = token;
        Ok(config)
    }

    /// Base URL (CLI → env → file).
    pub fn base_url(&self) -> String {
        self.cli_base_url
            .clone()
            .or_else(|| env_value(ENV_BASE_URL))
            .unwrap_or_else(|| self.toml.server.base_url.clone())
    }

    pub fn urls(&self) -> ServerUrls {
        ServerUrls::new(&self.base_url())
    }

    /// Team (CLI → env → file).
    pub fn team(&self) -> Option<String> {
        self.cli_team
            .clone()
            .or_else(|| env_value(ENV_TEAM))
            .or_else(|| self.toml.session.team.clone())
    }

    /// Team, or an error naming every place it can be set.
    pub fn require_team(&self) -> Result<String> {
        self.team().with_context(|| {
            format!(
                "No team configured. Pass --team, set {} or add [session] team to {}",
                ENV_TEAM,
                self.path.display()
            )
        })
    }

    /// Token (CLI → env → file).
    pub fn token(&self) -> Option<String> {
        self.cli_token
            .clone()
            .or_else(|| env_value(ENV_TOKEN))
            .or_else(|| self.toml.session.token.clone())
    }

    /// Token store seeded the way the login flow would leave it: the token
    /// filed under the team path.
    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        match (self.team(), self.token()) {
            (Some(team), Some(token)) => {
                let jar = CookieJar::new();
                jar.set_team_token(&self.urls(), &team, &token);
                Arc::new(jar)
            }
            (None, token) => Arc::new(StaticToken(token)),
            (Some(_), None) => Arc::new(StaticToken(None)),
        }
    }

    pub fn logging(&self) -> &LoggingSection {
        &self.toml.logging
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
