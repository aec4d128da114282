//! Status bridge configuration management
//!
//! Configuration is read from TOML. Every field has a default, so an empty
//! file (or no file at all) yields a bridge that talks to the local gateway
//! and publishes into `./data/`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main status bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Gateway connection configuration
    pub gateway: GatewayConfig,

    /// Credential lookup configuration
    pub credentials: CredentialsConfig,

    /// Status publishing configuration
    pub status: StatusConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("Invalid config at {}: {}", path.display(), e)))
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Default config file location (~/.config/status-bridge/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("status-bridge").join("config.toml"))
    }

    /// Load the explicit path if given, else the default location if it
    /// exists, else built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Gateway connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// WebSocket URL of the gateway
    pub url: String,

    /// Fixed delay between a disconnect and the next connection attempt
    pub reconnect_delay_secs: u64,

    /// How long to wait for the connect response
    pub handshake_timeout_secs: u64,

    /// Lowest protocol version the bridge speaks
    pub min_protocol: u32,

    /// Highest protocol version the bridge speaks
    pub max_protocol: u32,

    /// Client identity announced in the handshake
    pub client_id: String,

    /// Client version announced in the handshake
    pub client_version: String,

    /// Client mode announced in the handshake
    pub client_mode: String,

    /// Platform announced in the handshake
    pub platform: String,

    /// Requested role
    pub role: String,

    /// Requested scopes
    pub scopes: Vec<String>,

    /// Locale announced in the handshake
    pub locale: String,

    /// User agent announced in the handshake
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:18789".to_string(),
            reconnect_delay_secs: 5,
            handshake_timeout_secs: 10,
            min_protocol: 3,
            max_protocol: 3,
            client_id: "gateway-client".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            client_mode: "backend".to_string(),
            platform: std::env::consts::OS.to_string(),
            role: "operator".to_string(),
            scopes: vec!["operator.read".to_string()],
            locale: "en-US".to_string(),
            user_agent: format!("status-bridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Credential lookup configuration
///
/// Both lists are in precedence order: every environment variable is tried
/// before any config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Environment variables holding the gateway token
    pub env_vars: Vec<String>,

    /// JSON config files holding `gateway.auth.token` (`~` is expanded)
    pub config_files: Vec<PathBuf>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_vars: vec![
                "OPENCLAW_GATEWAY_TOKEN".to_string(),
                "CLAWDBOT_GATEWAY_TOKEN".to_string(),
            ],
            config_files: vec![
                PathBuf::from("~/.openclaw/openclaw.json"),
                PathBuf::from("~/.clawdbot/clawdbot.json"),
            ],
        }
    }
}

/// Status publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Primary status file; the dashboard's source of truth
    pub primary: PathBuf,

    /// Best-effort mirrors of the primary status file
    pub mirrors: Vec<PathBuf>,

    /// Sub-agent roster written by an external actor
    pub subagents_file: PathBuf,

    /// Manual alert override written by an external actor
    pub alert_file: PathBuf,

    /// Maximum number of activity log entries kept
    pub activity_log_limit: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            primary: PathBuf::from("data/agent-status.json"),
            mirrors: vec![PathBuf::from("~/.openclaw/workspace/agent-status.json")],
            subagents_file: PathBuf::from("data/subagents.json"),
            alert_file: PathBuf::from("data/alert.json"),
            activity_log_limit: 10,
        }
    }
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading `~`, or any path when the home directory is
/// unknown, are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs_next::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
