//! Configuration loading and typed config structures for Keel.
//!
//! The configuration lives in `keel-config.yaml`. This module defines
//! strongly-typed structs that mirror the YAML structure and a loader that
//! reads the file, falling back to defaults when it does not exist.
//!
//! ```yaml
//! persistence:
//!   save_throttle_ms: 30000
//! local:
//!   directory: .keel/projects
//! remote:
//!   base_url: http://127.0.0.1:8787
//!   user_token: alice
//!   request_timeout_ms: 10000
//! server:
//!   host: 127.0.0.1
//!   port: 8787
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "keel-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Keel configuration.
///
/// Mirrors the structure of `keel-config.yaml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeelConfig {
    /// Save orchestration settings.
    #[serde(default)]
    pub persistence: PersistenceSection,

    /// Local store settings.
    #[serde(default)]
    pub local: LocalConfig,

    /// Remote project service settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Reference server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl KeelConfig {
    /// Load configuration from a YAML file.
    ///
    /// After parsing, environment variable overrides are applied:
    /// - `KEEL_REMOTE_URL` overrides `remote.base_url`
    /// - `KEEL_USER_TOKEN` overrides `remote.user_token`
    /// - `KEEL_SERVER_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse_yaml(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from `path`, or defaults if the file is missing.
    ///
    /// Environment overrides apply in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_yaml(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("KEEL_REMOTE_URL") {
            self.remote.base_url = url;
        }
        if let Some(token) = lookup("KEEL_USER_TOKEN") {
            self.remote.user_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(port) = lookup("KEEL_SERVER_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!("Ignoring invalid KEEL_SERVER_PORT {port:?}: {e}"),
            }
        }
    }
}

/// Save orchestration settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceSection {
    /// Length of the throttle window for non-forced saves.
    #[serde(default = "default_save_throttle_ms")]
    pub save_throttle_ms: u64,
}

impl PersistenceSection {
    /// The throttle window as a [`Duration`].
    pub const fn save_throttle(&self) -> Duration {
        Duration::from_millis(self.save_throttle_ms)
    }
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            save_throttle_ms: default_save_throttle_ms(),
        }
    }
}

/// Local store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalConfig {
    /// Directory holding one JSON file per local project.
    #[serde(default = "default_local_directory")]
    pub directory: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            directory: default_local_directory(),
        }
    }
}

/// Remote project service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote project service.
    #[serde(default = "default_remote_url")]
    pub base_url: String,

    /// Identity sent with every request. Sessions start authenticated
    /// when a token is configured.
    #[serde(default)]
    pub user_token: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl RemoteConfig {
    /// The request timeout as a [`Duration`].
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_url(),
            user_token: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Reference server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

const fn default_save_throttle_ms() -> u64 {
    30_000
}

fn default_local_directory() -> PathBuf {
    PathBuf::from(".keel/projects")
}

fn default_remote_url() -> String {
    "http://127.0.0.1:8787".to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_server_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_server_port() -> u16 {
    8787
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults() {
        let config = KeelConfig::default();
        assert_eq!(config.persistence.save_throttle(), Duration::from_secs(30));
        assert_eq!(config.local.directory, PathBuf::from(".keel/projects"));
        assert!(config.remote.user_token.is_none());
        assert_eq!(config.server.port, 8787);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
persistence:
  save_throttle_ms: 500
remote:
  user_token: alice
";
        let mut config: KeelConfig = serde_yml::from_str(yaml).unwrap();
        config.apply_overrides(no_env);

        assert_eq!(config.persistence.save_throttle_ms, 500);
        assert_eq!(config.remote.user_token.as_deref(), Some("alice"));
        assert_eq!(config.remote.request_timeout_ms, 10_000);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(KeelConfig::parse_yaml("").unwrap(), KeelConfig::default());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = KeelConfig::parse_yaml("persistence: [not, a, mapping");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = KeelConfig::default();
        config.apply_overrides(|name| match name {
            "KEEL_REMOTE_URL" => Some("http://remote:9000".to_owned()),
            "KEEL_USER_TOKEN" => Some("bob".to_owned()),
            "KEEL_SERVER_PORT" => Some("9001".to_owned()),
            _ => None,
        });
        assert_eq!(config.remote.base_url, "http://remote:9000");
        assert_eq!(config.remote.user_token.as_deref(), Some("bob"));
        assert_eq!(config.server.port, 9001);
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = KeelConfig::default();
        config.apply_overrides(|name| (name == "KEEL_SERVER_PORT").then(|| "http".to_owned()));
        assert_eq!(config.server.port, 8787);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = KeelConfig::load_or_default(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.persistence, PersistenceSection::default());
    }
}
