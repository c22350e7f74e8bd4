//! Command-line client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via HUBLINK_CONFIG)
//! 3. Environment variables
//! 4. Command-line flags (applied by the caller)

use hublink_client::{HubConfig, TlsClientConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hub connection settings.
    pub connection: ConnectionConfig,
    /// TLS settings.
    pub tls: TlsConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("HUBLINK_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a variable lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.connection.apply_overrides(&lookup);
        self.tls.apply_overrides(&lookup);
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection.validate()?;
        self.tls.validate()
    }

    /// Builds the library configuration.
    pub fn hub_config(&self) -> HubConfig {
        let mut tls = TlsClientConfig::new();
        if let Some(ref path) = self.tls.ca_cert_path {
            tls = tls.with_ca_cert(path);
        }
        if self.tls.insecure {
            tls = tls.with_insecure();
        }

        let mut hub = HubConfig::new(&self.connection.url, &self.connection.hub).with_tls(tls);
        if let Some(timeout) = self.connection.connect_timeout() {
            hub = hub.with_connect_timeout(timeout);
        }
        if let Some(timeout) = self.connection.receive_timeout() {
            hub = hub.with_receive_timeout(timeout);
        }
        hub
    }
}

/// Hub connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Base server URL.
    pub url: String,
    /// Hub name.
    pub hub: String,
    /// Connect timeout in seconds (none = wait indefinitely).
    pub connect_timeout_secs: Option<u64>,
    /// Per-frame receive timeout in seconds (none = wait indefinitely).
    pub receive_timeout_secs: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:5001".to_string(),
            hub: "gameHub".to_string(),
            connect_timeout_secs: None,
            receive_timeout_secs: None,
        }
    }
}

impl ConnectionConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("HUBLINK_URL") {
            self.url = url;
        }
        if let Some(hub) = lookup("HUBLINK_HUB") {
            self.hub = hub;
        }
        if let Some(secs) = lookup("HUBLINK_CONNECT_TIMEOUT") {
            if let Ok(parsed) = secs.parse() {
                self.connect_timeout_secs = Some(parsed);
            }
        }
        if let Some(secs) = lookup("HUBLINK_RECEIVE_TIMEOUT") {
            if let Ok(parsed) = secs.parse() {
                self.receive_timeout_secs = Some(parsed);
            }
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.url).map_err(|e| {
            ConfigError::ValidationError(format!("invalid url '{}': {}", self.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "url '{}' must use http or https",
                self.url
            )));
        }
        if self.hub.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "hub name must not be empty".to_string(),
            ));
        }
        if self.connect_timeout_secs == Some(0) || self.receive_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

/// TLS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Skip server certificate verification (INSECURE - development only).
    pub insecure: bool,
    /// Path to PEM-encoded CA certificate(s) for server verification.
    pub ca_cert_path: Option<PathBuf>,
}

impl TlsConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(insecure) = lookup("HUBLINK_TLS_INSECURE") {
            self.insecure = insecure == "1" || insecure.to_lowercase() == "true";
        }
        if let Some(path) = lookup("HUBLINK_CA_CERT") {
            self.ca_cert_path = Some(PathBuf::from(path));
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.ca_cert_path {
            if !path.is_file() {
                return Err(ConfigError::ValidationError(format!(
                    "CA certificate '{}' not found",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
