//! Configuration loading, validation, and management for calcgrid.
//!
//! Loads configuration from `~/.calcgrid/config.toml` (or the file named by
//! `CALCGRID_CONFIG`) with environment variable overrides. Operation time
//! limits have no defaults: the orchestrator refuses to start without them.

use calcgrid_core::OperationLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "CALCGRID_CONFIG";

/// The root configuration structure.
///
/// Maps directly to `~/.calcgrid/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Orchestrator listen address
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Per-operator execution time limits
    #[serde(default)]
    pub operations: OperationsConfig,

    /// Worker agent settings
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8080
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// A duration as written in the config file: an integer number of
/// milliseconds, or a string such as `"250ms"`, `"2s"` or `"1m"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationSetting {
    Millis(u64),
    Text(String),
}

impl DurationSetting {
    pub fn to_duration(&self) -> Option<Duration> {
        match self {
            Self::Millis(ms) => Some(Duration::from_millis(*ms)),
            Self::Text(text) => parse_duration(text),
        }
    }
}

impl std::fmt::Display for DurationSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Millis(ms) => write!(f, "{ms}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Maximum time an agent may take for each operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addition: Option<DurationSetting>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtraction: Option<DurationSetting>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplication: Option<DurationSetting>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<DurationSetting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the orchestrator
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Number of tasks computed concurrently
    #[serde(default = "default_computing_power")]
    pub computing_power: usize,

    /// Delay between polls for new work
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_server_url() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_computing_power() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    30
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            computing_power: default_computing_power(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl AgentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Override agent settings from `COMPUTING_POWER` and
    /// `CALCGRID_SERVER_URL`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("COMPUTING_POWER") {
            self.computing_power = value.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "COMPUTING_POWER must be a positive integer, got '{value}'"
                ))
            })?;
        }

        if let Some(url) = lookup("CALCGRID_SERVER_URL") {
            self.server_url = url;
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.computing_power == 0 {
            return Err(ConfigError::ValidationError(
                "agent.computing_power must be at least 1".into(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "agent.poll_interval_ms must be > 0".into(),
            ));
        }

        let url = &self.server_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "agent.server_url must be an http(s) URL, got '{url}'"
            )));
        }

        Ok(())
    }
}

/// Parse `"250ms"`, `"2s"`, `"1m"`, or a bare integer meaning milliseconds.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (digits, unit_ms) = if let Some(n) = text.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = text.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = text.strip_suffix('m') {
        (n, 60_000)
    } else {
        (text, 1)
    };
    let value: u64 = digits.trim().parse().ok()?;
    value.checked_mul(unit_ms).map(Duration::from_millis)
}

impl AppConfig {
    /// Load configuration from `CALCGRID_CONFIG` or the default path, then
    /// apply environment variable overrides:
    /// - `TIME_ADDITION_MS`, `TIME_SUBTRACTION_MS`,
    ///   `TIME_MULTIPLICATIONS_MS`, `TIME_DIVISIONS_MS`
    /// - `COMPUTING_POWER`
    /// - `CALCGRID_HOST`, `CALCGRID_PORT`, `CALCGRID_SERVER_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load only the agent section, with its environment overrides.
    ///
    /// Operation time limits and gateway settings are not validated here;
    /// the agent never reads them.
    pub fn load_agent() -> Result<AgentConfig, ConfigError> {
        Self::load_agent_from(&Self::config_path(), |key| std::env::var(key).ok())
    }

    pub fn load_agent_from<F>(path: &Path, lookup: F) -> Result<AgentConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut agent = Self::read_file(path)?.agent;
        agent.apply_env_overrides(lookup)?;
        agent.validate()?;
        Ok(agent)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without validating it. A missing file yields
    /// the defaults.
    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Override settings from the environment. `lookup` returns the value of
    /// a variable, if set.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ops = &mut self.operations;
        for (env, slot) in [
            ("TIME_ADDITION_MS", &mut ops.addition),
            ("TIME_SUBTRACTION_MS", &mut ops.subtraction),
            ("TIME_MULTIPLICATIONS_MS", &mut ops.multiplication),
            ("TIME_DIVISIONS_MS", &mut ops.division),
        ] {
            if let Some(value) = lookup(env) {
                let duration = parse_duration(&value).ok_or_else(|| ConfigError::InvalidDuration {
                    key: env.into(),
                    value: value.clone(),
                })?;
                *slot = Some(DurationSetting::Millis(duration.as_millis() as u64));
            }
        }

        if let Some(host) = lookup("CALCGRID_HOST") {
            self.gateway.host = host;
        }

        if let Some(value) = lookup("CALCGRID_PORT") {
            self.gateway.port = value.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("CALCGRID_PORT must be a port number, got '{value}'"))
            })?;
        }

        self.agent.apply_env_overrides(lookup)
    }

    /// Resolve the per-operator time limits. Every operator must be
    /// configured.
    pub fn operation_limits(&self) -> Result<OperationLimits, ConfigError> {
        let ops = &self.operations;
        let resolve = |operator: &'static str,
                       env: &'static str,
                       setting: &Option<DurationSetting>|
         -> Result<Duration, ConfigError> {
            let setting = setting
                .as_ref()
                .ok_or(ConfigError::MissingOperationTime { operator, env })?;
            setting.to_duration().ok_or_else(|| ConfigError::InvalidDuration {
                key: format!("operations.{operator}"),
                value: setting.to_string(),
            })
        };

        Ok(OperationLimits {
            addition: resolve("addition", "TIME_ADDITION_MS", &ops.addition)?,
            subtraction: resolve("subtraction", "TIME_SUBTRACTION_MS", &ops.subtraction)?,
            multiplication: resolve("multiplication", "TIME_MULTIPLICATIONS_MS", &ops.multiplication)?,
            division: resolve("division", "TIME_DIVISIONS_MS", &ops.division)?,
        })
    }

    /// Path of the active config file.
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("config.toml"))
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".calcgrid")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.agent.validate()?;

        for (name, setting) in [
            ("addition", &self.operations.addition),
            ("subtraction", &self.operations.subtraction),
            ("multiplication", &self.operations.multiplication),
            ("division", &self.operations.division),
        ] {
            if let Some(setting) = setting
                && setting.to_duration().is_none()
            {
                return Err(ConfigError::InvalidDuration {
                    key: format!("operations.{name}"),
                    value: setting.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No time limit configured for {operator} (set operations.{operator} or {env})")]
    MissingOperationTime {
        operator: &'static str,
        env: &'static str,
    },

    #[error("Invalid duration for {key}: '{value}'")]
    InvalidDuration { key: String, value: String },
}
