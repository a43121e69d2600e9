//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/chatpulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/chatpulse/` (~/.config/chatpulse/)
//! - State/Logs: `$XDG_STATE_HOME/chatpulse/` (~/.local/state/chatpulse/)
//!
//! The `[group]` section describes the chat being analysed. It is loaded once
//! and shared read-only by the parser, merger and aggregator.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Date format used for chat-creation and join dates in activity logs and reports.
pub const DISPLAY_DATE_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Group metadata, alias table and exclusions
    #[serde(default)]
    pub group: GroupConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Static description of the group chat whose transcript is analysed.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Display name of the group itself (appears as a sender on system lines)
    #[serde(default = "default_group_name")]
    pub group_name: String,

    /// Identity the exporting device uses for itself
    #[serde(default = "default_uploader_label")]
    pub uploader_label: String,

    /// Name that replaces "You" when the uploader added someone
    #[serde(default = "default_uploader_name")]
    pub uploader_name: String,

    /// Who created the group
    #[serde(default)]
    pub creator: String,

    /// When the group was created, e.g. `"2021-03-14T09:30:00"`
    #[serde(default = "default_created_at")]
    pub created_at: NaiveDateTime,

    /// Members known to have left the group
    #[serde(default)]
    pub left_chat: Vec<String>,

    /// Name substrings whose logs always get the creation placeholder
    #[serde(default)]
    pub anomalies: Vec<String>,

    /// Phrase WhatsApp uses for invite-link joins
    #[serde(default = "default_invite_link_phrase")]
    pub invite_link_phrase: String,

    /// Canonical names and the raw identities that belong to them
    #[serde(default)]
    pub aliases: AliasTable,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            group_name: default_group_name(),
            uploader_label: default_uploader_label(),
            uploader_name: default_uploader_name(),
            creator: String::new(),
            created_at: default_created_at(),
            left_chat: vec![],
            anomalies: vec![],
            invite_link_phrase: default_invite_link_phrase(),
            aliases: AliasTable::default(),
        }
    }
}

fn default_group_name() -> String {
    "Chat Name".to_string()
}

fn default_uploader_label() -> String {
    "\u{200e}You".to_string()
}

fn default_uploader_name() -> String {
    "You".to_string()
}

fn default_created_at() -> NaiveDateTime {
    NaiveDateTime::default()
}

fn default_invite_link_phrase() -> String {
    "joined using this group's invite link".to_string()
}

impl GroupConfig {
    /// Names removed from the merged message counts.
    ///
    /// The group's own name, the uploader's self-identity and everyone who left.
    pub fn excluded_names(&self) -> impl Iterator<Item = &str> {
        [self.group_name.as_str(), self.uploader_label.as_str()]
            .into_iter()
            .chain(self.left_chat.iter().map(String::as_str))
    }

    /// Whether `name` contains one of the configured anomaly substrings.
    pub fn is_anomaly(&self, name: &str) -> bool {
        self.anomalies
            .iter()
            .any(|marker| !marker.is_empty() && name.contains(marker.as_str()))
    }

    /// Chat creation time rendered for activity logs.
    pub fn created_at_display(&self) -> String {
        self.created_at.format(DISPLAY_DATE_FORMAT).to_string()
    }

    /// The seed entry of the creator's activity log.
    pub fn created_entry(&self) -> String {
        format!("{}{}", CREATED_CHAT_PREFIX, self.created_at_display())
    }

    /// Entry for members whose add event predates the transcript.
    pub fn added_placeholder(&self) -> String {
        format!(
            "Added by {} on or before {}",
            self.creator,
            self.created_at.format("%m/%d/%Y")
        )
    }

    /// Validate the alias table invariants.
    pub fn validate(&self) -> Result<()> {
        self.aliases.validate()
    }
}

/// Prefix of the creator's seed log entry.
pub const CREATED_CHAT_PREFIX: &str = "Created chat on ";

/// One canonical member and the raw identities folded into it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AliasEntry {
    /// Canonical display name
    pub name: String,
    /// Raw identities, in merge order
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Ordered mapping from canonical names to alias identities.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    pub fn new(entries: Vec<AliasEntry>) -> Self {
        Self { entries }
    }

    /// Build a table from `(canonical, aliases)` pairs.
    pub fn from_pairs<I, N, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, aliases)| AliasEntry {
                    name: name.into(),
                    aliases: aliases.into_iter().map(Into::into).collect(),
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is a canonical name or an alias of one.
    pub fn is_mapped(&self, name: &str) -> bool {
        self.canonical_for(name).is_some()
    }

    /// Canonical name that `identity` resolves to, if it is mapped at all.
    pub fn canonical_for(&self, identity: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == identity || entry.aliases.iter().any(|a| a == identity))
            .map(|entry| entry.name.as_str())
    }

    /// Aliases are disjoint across entries and never name a canonical user.
    pub fn validate(&self) -> Result<()> {
        let canonical: HashSet<&str> = self.entries.iter().map(|e| e.name.as_str()).collect();
        if canonical.len() != self.entries.len() {
            return Err(Error::Config(
                "group.aliases contains a duplicate canonical name".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            for alias in &entry.aliases {
                if canonical.contains(alias.as_str()) {
                    return Err(Error::Config(format!(
                        "alias {:?} of {:?} is itself a canonical name",
                        alias, entry.name
                    )));
                }
                if !seen.insert(alias.as_str()) {
                    return Err(Error::Config(format!(
                        "alias {:?} is listed under more than one canonical name",
                        alias
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the analysis endpoint listens on
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// Largest accepted transcript upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.group.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/chatpulse/config.toml` (~/.config/chatpulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("chatpulse").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/chatpulse/` (~/.local/state/chatpulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("chatpulse")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/chatpulse/chatpulse.log` (~/.local/state/chatpulse/chatpulse.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("chatpulse.log")
    }
}
