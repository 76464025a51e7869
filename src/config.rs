//! Configuration module
//!
//! The gateway reads one TOML file. Every section has defaults, so an empty
//! file (or no file at all) yields a runnable configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::database::DEFAULT_DATABASE_URL;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

const APP_DIR: &str = "charging-gateway";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Sections ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    pub ws_host: String,
    pub ws_port: u16,
    /// Seconds to wait for tasks to drain after a shutdown signal
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            ws_host: "0.0.0.0".to_string(),
            ws_port: 9000,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.ws_host, self.ws_port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub window_minutes: i64,
    /// 0 disables the sweeper
    pub expiry_sweep_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            window_minutes: crate::application::charging_session::DEFAULT_SESSION_WINDOW_MINUTES,
            expiry_sweep_secs: 60,
        }
    }
}

impl SessionsConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.window_minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubsConfig {
    /// Device classes to serve; each gets its own registry
    pub enabled: Vec<String>,
    /// Write `"ready"` back after every hardware message
    pub ready_ack: bool,
    /// 0 keeps silent connections open forever
    pub idle_timeout_secs: u64,
}

impl Default for HubsConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["ocpp".into(), "hardware".into(), "solar".into()],
            ready_ack: true,
            idle_timeout_secs: 0,
        }
    }
}

impl HubsConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

// ── AppConfig ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub logging: LoggingConfig,
    pub sessions: SessionsConfig,
    pub hubs: HubsConfig,
}

impl AppConfig {
    /// Read and validate `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let body = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        std::fs::write(path, body).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.server.api_port != 0
            && self.server.api_port == self.server.ws_port
            && self.server.api_host == self.server.ws_host
        {
            return invalid("server.api_port and server.ws_port must differ");
        }
        if self.database.url.trim().is_empty() {
            return invalid("database.url is required");
        }
        if !matches!(self.logging.format.to_lowercase().as_str(), "pretty" | "json") {
            return invalid("logging.format must be \"pretty\" or \"json\"");
        }
        if self.sessions.window_minutes <= 0 {
            return invalid("sessions.window_minutes must be positive");
        }
        if self.hubs.enabled.is_empty() {
            return invalid("hubs.enabled must name at least one device class");
        }
        if self.hubs.enabled.iter().any(|c| c == crate::interfaces::ws::routes::DASHBOARD_SEGMENT) {
            return invalid("hubs.enabled cannot contain the reserved class \"frontend\"");
        }
        Ok(())
    }
}

/// `$GATEWAY_CONFIG`, else `<config_dir>/charging-gateway/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}
