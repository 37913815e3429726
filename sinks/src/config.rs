//! Configuration for kubewatch sinks
//!
//! Sink settings come from a YAML file (`handler.graph.*`); runtime knobs such as
//! logging come from environment variables.

use crate::error::{KubewatchError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable pointing at the config file
pub const CONFIG_PATH_ENV: &str = "KW_CONFIG";

/// Config file name looked up in the home directory
const DEFAULT_CONFIG_FILE: &str = ".kubewatch.yaml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Per-sink settings
    #[serde(default)]
    pub handler: HandlerConfig,

    /// Log level
    #[serde(skip)]
    pub log_level: LogLevel,

    /// Log format (json or pretty)
    #[serde(skip)]
    pub log_format: LogFormat,
}

/// Settings for each selectable sink
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Graph sink settings as written in the config file
///
/// Empty strings and a zero timeout mean "not set"; the sink resolves them from
/// the environment or built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphConfig {
    /// Select the graph sink
    pub enabled: bool,
    /// Gremlin websocket endpoint, e.g. `wss://cluster:8182/gremlin`
    pub endpoint: String,
    /// Region of the graph store cluster
    pub region: String,
    /// Traversal source name on the server
    pub traversal_source: String,
    /// Timeout in seconds
    pub timeout: u64,
    /// Skip TLS certificate verification
    pub tls_skip: bool,
}

/// Newtype so the level has a default of "info"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLevel(pub String);

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel("info".to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl Config {
    /// Parse a config file body
    pub fn from_yaml(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(body)?)
    }

    /// Load the config file at `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(body) => Self::from_yaml(&body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Default config file location: `$KW_CONFIG`, else `$HOME/.kubewatch.yaml`
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_CONFIG_FILE))
    }

    /// Load the config file and apply environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load(&path)?,
            None => Config::default(),
        };

        if let Ok(level) = env::var("KW_LOG_LEVEL") {
            config.log_level = LogLevel(level);
        }

        if let Ok(format) = env::var("KW_LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(KubewatchError::Config(format!(
                        "invalid KW_LOG_FORMAT: {other} (expected 'json' or 'pretty')"
                    )));
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.handler.graph.enabled);
        assert_eq!(config.handler.graph.timeout, 0);
        assert_eq!(config.log_level, LogLevel("info".into()));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_from_yaml_camel_case_fields() {
        let config = Config::from_yaml(
            r#"
handler:
  graph:
    enabled: true
    endpoint: wss://graph.example.com:8182/gremlin
    region: us-east-1
    traversalSource: custom_g
    timeout: 60
    tlsSkip: true
"#,
        )
        .unwrap();

        let graph = &config.handler.graph;
        assert!(graph.enabled);
        assert_eq!(graph.endpoint, "wss://graph.example.com:8182/gremlin");
        assert_eq!(graph.region, "us-east-1");
        assert_eq!(graph.traversal_source, "custom_g");
        assert_eq!(graph.timeout, 60);
        assert!(graph.tls_skip);
    }

    #[test]
    fn test_from_yaml_partial_and_empty() {
        let config = Config::from_yaml("handler:\n  graph:\n    region: eu-west-1\n").unwrap();
        assert_eq!(config.handler.graph.region, "eu-west-1");
        assert_eq!(config.handler.graph.endpoint, "");

        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        let err = Config::from_yaml("handler: [1, 2").unwrap_err();
        assert!(matches!(err, KubewatchError::Yaml(_)));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let config = Config::load(Path::new("/nonexistent/kubewatch/config.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
