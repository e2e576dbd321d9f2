//! Configuration management for businessmap-mcp.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. TOML file in the platform config directory
//!    (`~/.config/businessmap-mcp/config.toml` on Linux/macOS,
//!    `%APPDATA%\businessmap-mcp\config.toml` on Windows)
//! 2. Environment variables (`BUSINESSMAP_URL`, `BUSINESSMAP_APIKEY`, ...)
//! 3. Command-line flags, applied by the binary
//!
//! # Example
//!
//! ```ignore
//! use businessmap_core::Config;
//!
//! let mut config = Config::load_from(&Config::config_path()?)?;
//! config.apply_env()?;
//! config.validate()?;
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "businessmap-mcp";

/// Default SSE port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default per-call timeout for tool invocations.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Businessmap connection settings
    #[serde(default)]
    pub businessmap: BusinessmapConfig,

    /// Server/transport settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Businessmap connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessmapConfig {
    /// Base URL of the Businessmap instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// API key sent in the `apikey` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    /// Reject every mutating tool
    #[serde(default)]
    pub read_only: bool,
    /// Only expose these board IDs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boards_filter: Option<Vec<String>>,
}

impl Default for BusinessmapConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            ssl_verify: true,
            read_only: false,
            boards_filter: None,
        }
    }
}

/// Server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub transport: Transport,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Per-call timeout in seconds; 0 disables it
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            port: DEFAULT_PORT,
            host: default_host(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Per-call timeout, or `None` when disabled.
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }
}

/// Transport the server listens on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Sse,
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "sse" => Ok(Transport::Sse),
            other => Err(Error::Config(format!(
                "Unknown transport '{}'. Expected 'stdio' or 'sse'",
                other
            ))),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => f.write_str("stdio"),
            Transport::Sse => f.write_str("sse"),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_call_timeout() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

/// Split a comma-separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strict boolean parsing for `config set` and command-line flags.
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("Invalid boolean value: {}", other))),
    }
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup function.
    ///
    /// `BUSINESSMAP_SSL_VERIFY` only turns verification off for `false`, `0`
    /// or `no`; `READ_ONLY_MODE` only turns read-only on for `true`, `1` or `yes`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bm = &mut self.businessmap;

        if let Some(url) = lookup("BUSINESSMAP_URL").filter(|v| !v.is_empty()) {
            bm.url = Some(url);
        }
        if let Some(key) = lookup("BUSINESSMAP_APIKEY").filter(|v| !v.is_empty()) {
            bm.api_key = Some(key);
        }
        if let Some(value) = lookup("BUSINESSMAP_SSL_VERIFY") {
            bm.ssl_verify = !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "false" | "0" | "no"
            );
        }
        if let Some(value) = lookup("READ_ONLY_MODE") {
            bm.read_only = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            );
        }
        if let Some(value) = lookup("BUSINESSMAP_BOARDS_FILTER") {
            let boards = split_list(&value);
            bm.boards_filter = (!boards.is_empty()).then_some(boards);
        }

        if let Some(value) = lookup("MCP_TRANSPORT") {
            self.server.transport = value.parse()?;
        }
        if let Some(value) = lookup("MCP_PORT") {
            self.server.port = value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid MCP_PORT: {}", value)))?;
        }

        Ok(())
    }

    /// Check that everything needed to reach Businessmap is present.
    pub fn validate(&self) -> Result<()> {
        let url = self
            .businessmap
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "Businessmap URL is required (BUSINESSMAP_URL or --businessmap-url)"
                        .to_string(),
                )
            })?;

        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Config(format!("Invalid Businessmap URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Businessmap URL must use http or https: {}",
                url
            )));
        }

        if !matches!(self.businessmap.api_key.as_deref(), Some(k) if !k.trim().is_empty()) {
            return Err(Error::Config(
                "Businessmap API key is required (BUSINESSMAP_APIKEY or --businessmap-apikey)"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Copy of the config with the API key masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(key) = config.businessmap.api_key.as_mut() {
            *key = "********".to_string();
        }
        config
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `businessmap.url`, `server.port`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match section {
            "businessmap" => {
                let bm = &mut self.businessmap;
                match field {
                    "url" => bm.url = Some(value.to_string()),
                    "api_key" | "apikey" => bm.api_key = Some(value.to_string()),
                    "ssl_verify" => bm.ssl_verify = parse_bool(value)?,
                    "read_only" => bm.read_only = parse_bool(value)?,
                    "boards_filter" | "boards" => {
                        let boards = split_list(value);
                        bm.boards_filter = (!boards.is_empty()).then_some(boards);
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown businessmap config field: {}",
                            field
                        )))
                    }
                }
            }
            "server" => {
                let server = &mut self.server;
                match field {
                    "transport" => server.transport = value.parse()?,
                    "port" => {
                        server.port = value
                            .parse()
                            .map_err(|_| Error::Config(format!("Invalid port: {}", value)))?
                    }
                    "host" => server.host = value.to_string(),
                    "call_timeout_secs" | "timeout" => {
                        server.call_timeout_secs = value
                            .parse()
                            .map_err(|_| Error::Config(format!("Invalid timeout: {}", value)))?
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown server config field: {}",
                            field
                        )))
                    }
                }
            }
            _ => {
                return Err(Error::Config(format!("Unknown config section: {}", section)));
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `businessmap.url`, `server.port`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        match section {
            "businessmap" => {
                let bm = &self.businessmap;
                match field {
                    "url" => Ok(bm.url.clone()),
                    "api_key" | "apikey" => Ok(bm.api_key.clone()),
                    "ssl_verify" => Ok(Some(bm.ssl_verify.to_string())),
                    "read_only" => Ok(Some(bm.read_only.to_string())),
                    "boards_filter" | "boards" => Ok(bm.boards_filter.as_ref().map(|b| b.join(","))),
                    _ => Err(Error::Config(format!(
                        "Unknown businessmap config field: {}",
                        field
                    ))),
                }
            }
            "server" => {
                let server = &self.server;
                match field {
                    "transport" => Ok(Some(server.transport.to_string())),
                    "port" => Ok(Some(server.port.to_string())),
                    "host" => Ok(Some(server.host.clone())),
                    "call_timeout_secs" | "timeout" => {
                        Ok(Some(server.call_timeout_secs.to_string()))
                    }
                    _ => Err(Error::Config(format!(
                        "Unknown server config field: {}",
                        field
                    ))),
                }
            }
            _ => Err(Error::Config(format!("Unknown config section: {}", section))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    key.split_once('.')
        .filter(|(section, field)| !section.is_empty() && !field.contains('.'))
        .ok_or_else(|| {
            Error::Config(format!(
                "Invalid config key '{}'. Expected format: section.field",
                key
            ))
        })
}

// =============================================================================
// Tests
// =============================================================================
